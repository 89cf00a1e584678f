// Numeric tower: string -> number parsing, integer/float arithmetic,
// exact mixed comparisons and number formatting.

use crate::lua_value::LuaValue;
use crate::lua_vm::{IntegerWidth, TmKind};

/// Arithmetic operators with a metamethod fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Mod,
    Pow,
    Div,
    IDiv,
    Unm,
}

impl ArithOp {
    /// The metamethod consulted when an operand is not a number.
    pub fn tm(self) -> TmKind {
        match self {
            ArithOp::Add => TmKind::Add,
            ArithOp::Sub => TmKind::Sub,
            ArithOp::Mul => TmKind::Mul,
            ArithOp::Mod => TmKind::Mod,
            ArithOp::Pow => TmKind::Pow,
            ArithOp::Div => TmKind::Div,
            ArithOp::IDiv => TmKind::IDiv,
            ArithOp::Unm => TmKind::Unm,
        }
    }
}

/// Float to integer rounding modes (F2Ieq, F2Ifloor, F2Iceil)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum F2IMode {
    Exact,
    Floor,
    Ceil,
}

/// Convert a float to an integer under `mode`; `None` when the rounded
/// value is outside the integer range or NaN.
#[inline]
pub fn float_to_integer_mode(f: f64, mode: F2IMode) -> Option<i64> {
    let g = match mode {
        F2IMode::Exact => {
            if f.floor() != f {
                return None;
            }
            f
        }
        F2IMode::Floor => f.floor(),
        F2IMode::Ceil => f.ceil(),
    };
    // -2^63 is exact in f64, 2^63 is the first value out of range
    if (-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&g) {
        Some(g as i64)
    } else {
        None
    }
}

/// Exact float -> integer conversion.
#[inline]
pub fn float_to_integer(f: f64) -> Option<i64> {
    float_to_integer_mode(f, F2IMode::Exact)
}

/// Check if a float value exactly equals an integer value.
#[inline]
pub fn float_eq_int(f: f64, i: i64) -> bool {
    float_to_integer(f) == Some(i)
}

// Integers in this range convert to f64 without rounding
#[inline]
fn int_fits_float(i: i64) -> bool {
    i.unsigned_abs() <= (1u64 << f64::MANTISSA_DIGITS)
}

/// i < f
pub fn lt_int_float(i: i64, f: f64) -> bool {
    if int_fits_float(i) {
        return (i as f64) < f;
    }
    match float_to_integer_mode(f, F2IMode::Ceil) {
        Some(fi) => i < fi,
        None => f > 0.0,
    }
}

/// i <= f
pub fn le_int_float(i: i64, f: f64) -> bool {
    if int_fits_float(i) {
        return (i as f64) <= f;
    }
    match float_to_integer_mode(f, F2IMode::Floor) {
        Some(fi) => i <= fi,
        None => f > 0.0,
    }
}

/// f < i
pub fn lt_float_int(f: f64, i: i64) -> bool {
    if int_fits_float(i) {
        return f < (i as f64);
    }
    match float_to_integer_mode(f, F2IMode::Floor) {
        Some(fi) => fi < i,
        None => f < 0.0,
    }
}

/// f <= i
pub fn le_float_int(f: f64, i: i64) -> bool {
    if int_fits_float(i) {
        return f <= (i as f64);
    }
    match float_to_integer_mode(f, F2IMode::Ceil) {
        Some(fi) => fi <= i,
        None => f < 0.0,
    }
}

/// `a < b` for two numbers; `None` if either operand is not a number.
pub fn num_lt(a: &LuaValue, b: &LuaValue) -> Option<bool> {
    Some(match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => x < y,
        (LuaValue::Integer(x), LuaValue::Float(y)) => lt_int_float(*x, *y),
        (LuaValue::Float(x), LuaValue::Integer(y)) => lt_float_int(*x, *y),
        (LuaValue::Float(x), LuaValue::Float(y)) => x < y,
        _ => return None,
    })
}

/// `a <= b` for two numbers; `None` if either operand is not a number.
pub fn num_le(a: &LuaValue, b: &LuaValue) -> Option<bool> {
    Some(match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => x <= y,
        (LuaValue::Integer(x), LuaValue::Float(y)) => le_int_float(*x, *y),
        (LuaValue::Float(x), LuaValue::Integer(y)) => le_float_int(*x, *y),
        (LuaValue::Float(x), LuaValue::Float(y)) => x <= y,
        _ => return None,
    })
}

// ============ Arithmetic ============

/// Floored integer modulo; `b` must be non-zero.
#[inline]
pub fn int_mod(a: i64, b: i64) -> i64 {
    let m = a.wrapping_rem(b);
    if m != 0 && (m ^ b) < 0 { m + b } else { m }
}

/// Floored integer division; `b` must be non-zero.
#[inline]
pub fn int_idiv(a: i64, b: i64) -> i64 {
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && (a ^ b) < 0 {
        q - 1
    } else {
        q
    }
}

/// Floored float modulo: the result has the sign of `b`.
#[inline]
pub fn float_mod(a: f64, b: f64) -> f64 {
    let m = a % b;
    if (m > 0.0 && b < 0.0) || (m < 0.0 && b != m && b > 0.0) {
        m + b
    } else {
        m
    }
}

fn float_arith(op: ArithOp, x: f64, y: f64) -> f64 {
    match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div => x / y,
        ArithOp::Mod => float_mod(x, y),
        ArithOp::Pow => x.powf(y),
        ArithOp::IDiv => (x / y).floor(),
        ArithOp::Unm => -x,
    }
}

fn int_arith(op: ArithOp, x: i64, y: i64, width: IntegerWidth) -> LuaValue {
    let r = match op {
        ArithOp::Add => x.wrapping_add(y),
        ArithOp::Sub => x.wrapping_sub(y),
        ArithOp::Mul => x.wrapping_mul(y),
        ArithOp::Unm => x.wrapping_neg(),
        ArithOp::Mod | ArithOp::IDiv if y == 0 => {
            return LuaValue::Float(float_arith(op, x as f64, y as f64));
        }
        ArithOp::Mod => int_mod(x, y),
        ArithOp::IDiv => int_idiv(x, y),
        ArithOp::Div | ArithOp::Pow => {
            return LuaValue::Float(float_arith(op, x as f64, y as f64));
        }
    };
    LuaValue::Integer(width.wrap(r))
}

/// Coerce a value to a number value, parsing strings.
pub fn to_numeric(v: &LuaValue) -> Option<LuaValue> {
    match v {
        LuaValue::Integer(_) | LuaValue::Float(_) => Some(v.clone()),
        LuaValue::String(s) => str2number(s.as_bytes()),
        _ => None,
    }
}

/// Raw arithmetic without metamethods.
///
/// Returns `None` when an operand is neither a number nor a numeric string.
pub fn arith(op: ArithOp, a: &LuaValue, b: &LuaValue, width: IntegerWidth) -> Option<LuaValue> {
    let a = to_numeric(a)?;
    let b = to_numeric(b)?;
    Some(match (a, b) {
        (LuaValue::Integer(x), LuaValue::Integer(y)) => int_arith(op, x, y, width),
        (LuaValue::Integer(x), LuaValue::Float(y)) => {
            LuaValue::Float(float_arith(op, x as f64, y))
        }
        (LuaValue::Float(x), LuaValue::Integer(y)) => {
            LuaValue::Float(float_arith(op, x, y as f64))
        }
        (LuaValue::Float(x), LuaValue::Float(y)) => LuaValue::Float(float_arith(op, x, y)),
        _ => return None,
    })
}

// ============ String -> number ============

// Whitespace accepted around numerals: " \f\n\r\t\v"
#[inline]
fn is_lua_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn trim_lua_space(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&c| !is_lua_space(c));
    let Some(start) = start else {
        return &[];
    };
    let end = bytes
        .iter()
        .rposition(|&c| !is_lua_space(c))
        .map_or(start, |e| e + 1);
    &bytes[start..end]
}

#[inline]
fn hex_value(c: u8) -> u64 {
    match c {
        b'0'..=b'9' => (c - b'0') as u64,
        b'a'..=b'f' => (c - b'a' + 10) as u64,
        _ => (c - b'A' + 10) as u64,
    }
}

/// Convert a numeral to a number value.
///
/// Accepts decimal and hexadecimal integers and floats with optional sign,
/// fraction, exponent (`e` or hex `p`) and surrounding whitespace.
/// Decimal integers that overflow become floats; hex integers wrap around.
pub fn str2number(bytes: &[u8]) -> Option<LuaValue> {
    let s = trim_lua_space(bytes);
    let (neg, body) = match s.first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if body.len() >= 2 && body[0] == b'0' && (body[1] | 0x20) == b'x' {
        parse_hex(&body[2..], neg)
    } else {
        parse_decimal(body, neg)
    }
}

fn parse_hex(body: &[u8], neg: bool) -> Option<LuaValue> {
    if !body.is_empty() && body.iter().all(u8::is_ascii_hexdigit) {
        let n = body
            .iter()
            .fold(0u64, |n, &c| n.wrapping_mul(16).wrapping_add(hex_value(c)));
        let i = n as i64;
        return Some(LuaValue::Integer(if neg { i.wrapping_neg() } else { i }));
    }

    let mut pos = 0;
    let mut mantissa = 0.0f64;
    let mut exponent: i64 = 0;
    let mut any_digit = false;
    while pos < body.len() && body[pos].is_ascii_hexdigit() {
        mantissa = mantissa * 16.0 + hex_value(body[pos]) as f64;
        any_digit = true;
        pos += 1;
    }
    if pos < body.len() && body[pos] == b'.' {
        pos += 1;
        while pos < body.len() && body[pos].is_ascii_hexdigit() {
            mantissa = mantissa * 16.0 + hex_value(body[pos]) as f64;
            exponent -= 4;
            any_digit = true;
            pos += 1;
        }
    }
    if !any_digit {
        return None;
    }
    if pos < body.len() && (body[pos] | 0x20) == b'p' {
        pos += 1;
        let exp_neg = match body.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };
        let digits_start = pos;
        let mut e: i64 = 0;
        while pos < body.len() && body[pos].is_ascii_digit() {
            e = e.saturating_mul(10).saturating_add((body[pos] - b'0') as i64);
            pos += 1;
        }
        if pos == digits_start {
            return None;
        }
        exponent = exponent.saturating_add(if exp_neg { -e } else { e });
    }
    if pos != body.len() {
        return None;
    }
    let exponent = exponent.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    let value = mantissa * 2.0f64.powi(exponent);
    Some(LuaValue::Float(if neg { -value } else { value }))
}

fn parse_decimal(body: &[u8], neg: bool) -> Option<LuaValue> {
    let mut pos = 0;
    let mut int_digits = 0;
    while pos < body.len() && body[pos].is_ascii_digit() {
        pos += 1;
        int_digits += 1;
    }
    let mut is_float = false;
    let mut frac_digits = 0;
    if pos < body.len() && body[pos] == b'.' {
        is_float = true;
        pos += 1;
        while pos < body.len() && body[pos].is_ascii_digit() {
            pos += 1;
            frac_digits += 1;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if pos < body.len() && (body[pos] | 0x20) == b'e' {
        is_float = true;
        pos += 1;
        if matches!(body.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exp_start = pos;
        while pos < body.len() && body[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == exp_start {
            return None;
        }
    }
    if pos != body.len() {
        return None;
    }

    if !is_float {
        // Accumulate unsigned so that -9223372036854775808 stays an integer
        let limit = i64::MAX as u64 + neg as u64;
        let mut n: u64 = 0;
        let mut overflow = false;
        for &c in body {
            let d = (c - b'0') as u64;
            match n.checked_mul(10).and_then(|n| n.checked_add(d)) {
                Some(v) if v <= limit => n = v,
                _ => {
                    overflow = true;
                    break;
                }
            }
        }
        if !overflow {
            let i = if neg {
                (n as i64).wrapping_neg()
            } else {
                n as i64
            };
            return Some(LuaValue::Integer(i));
        }
    }

    // Grammar already checked, so only digits, '.', 'e' and signs remain
    let text = std::str::from_utf8(body).ok()?;
    let value: f64 = text.parse().ok()?;
    Some(LuaValue::Float(if neg { -value } else { value }))
}

// ============ Number -> string ============

/// Format an integer the way `tostring` does.
pub fn fmt_integer(i: i64) -> String {
    let mut buffer = itoa::Buffer::new();
    buffer.format(i).to_owned()
}

/// Format a float with `%.14g`, adding `.0` when the result looks like an
/// integer.
pub fn fmt_float(f: f64) -> String {
    if f.is_nan() {
        return if f.is_sign_negative() { "-nan" } else { "nan" }.to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    let mut s = fmt_g14(f);
    if s.bytes().all(|c| c == b'-' || c.is_ascii_digit()) {
        s.push_str(".0");
    }
    s
}

const G_PRECISION: i32 = 14;

// printf("%.14g") for finite values
fn fmt_g14(f: f64) -> String {
    if f == 0.0 {
        return if f.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }
    let sci = format!("{:.*e}", (G_PRECISION - 1) as usize, f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exp < -4 || exp >= G_PRECISION {
        let mantissa = trim_fraction_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.unsigned_abs())
    } else {
        let decimals = (G_PRECISION - 1 - exp) as usize;
        let fixed = format!("{:.*}", decimals, f);
        trim_fraction_zeros(&fixed).to_owned()
    }
}

fn trim_fraction_zeros(s: &str) -> &str {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.')
}

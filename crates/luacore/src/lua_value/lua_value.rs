use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::gc::{identity_hash, mix64};
use crate::lua_value::lua_number::{
    F2IMode, float_eq_int, float_to_integer, float_to_integer_mode, fmt_float, fmt_integer,
    str2number,
};
use crate::lua_value::{
    FunctionPtr, LuaFunction, LuaString, LuaTable, LuaThread, LuaUserdata, StringPtr, TablePtr,
    ThreadPtr, UserdataPtr,
};
use crate::lua_vm::{LuaError, LuaResult};

/// A runtime value.
///
/// Nil, booleans and numbers are stored inline; strings and the reference
/// kinds are shared. Cloning a value never copies a string or a table.
#[derive(Clone, Default)]
pub enum LuaValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(StringPtr),
    Table(TablePtr),
    Function(FunctionPtr),
    Userdata(UserdataPtr),
    Thread(ThreadPtr),
}

// ============ Type enum for pattern matching ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LuaValueKind {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    Table,
    Function,
    Userdata,
    Thread,
}

impl LuaValueKind {
    pub fn type_name(self) -> &'static str {
        match self {
            LuaValueKind::Nil => "nil",
            LuaValueKind::Boolean => "boolean",
            LuaValueKind::Integer | LuaValueKind::Float => "number",
            LuaValueKind::String => "string",
            LuaValueKind::Table => "table",
            LuaValueKind::Function => "function",
            LuaValueKind::Userdata => "userdata",
            LuaValueKind::Thread => "thread",
        }
    }
}

impl LuaValue {
    // ============ Constructors ============

    #[inline(always)]
    pub fn nil() -> Self {
        LuaValue::Nil
    }

    #[inline(always)]
    pub fn boolean(b: bool) -> Self {
        LuaValue::Boolean(b)
    }

    #[inline(always)]
    pub fn integer(i: i64) -> Self {
        LuaValue::Integer(i)
    }

    #[inline(always)]
    pub fn float(n: f64) -> Self {
        LuaValue::Float(n)
    }

    /// A string value that is not interned. Use `LuaVM::create_string` to
    /// share short strings within a runtime instance.
    pub fn string(bytes: impl AsRef<[u8]>) -> Self {
        LuaValue::String(Rc::new(LuaString::new(bytes.as_ref())))
    }

    pub fn table(table: LuaTable) -> Self {
        LuaValue::Table(Rc::new(RefCell::new(table)))
    }

    pub fn function(function: LuaFunction) -> Self {
        LuaValue::Function(Rc::new(function))
    }

    pub fn userdata(userdata: LuaUserdata) -> Self {
        LuaValue::Userdata(Rc::new(userdata))
    }

    pub fn thread(thread: LuaThread) -> Self {
        LuaValue::Thread(Rc::new(thread))
    }

    // ============ Kind ============

    pub fn kind(&self) -> LuaValueKind {
        match self {
            LuaValue::Nil => LuaValueKind::Nil,
            LuaValue::Boolean(_) => LuaValueKind::Boolean,
            LuaValue::Integer(_) => LuaValueKind::Integer,
            LuaValue::Float(_) => LuaValueKind::Float,
            LuaValue::String(_) => LuaValueKind::String,
            LuaValue::Table(_) => LuaValueKind::Table,
            LuaValue::Function(_) => LuaValueKind::Function,
            LuaValue::Userdata(_) => LuaValueKind::Userdata,
            LuaValue::Thread(_) => LuaValueKind::Thread,
        }
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, LuaValue::Nil)
    }

    #[inline(always)]
    pub fn is_boolean(&self) -> bool {
        matches!(self, LuaValue::Boolean(_))
    }

    #[inline(always)]
    pub fn is_integer(&self) -> bool {
        matches!(self, LuaValue::Integer(_))
    }

    #[inline(always)]
    pub fn is_float(&self) -> bool {
        matches!(self, LuaValue::Float(_))
    }

    #[inline(always)]
    pub fn is_number(&self) -> bool {
        matches!(self, LuaValue::Integer(_) | LuaValue::Float(_))
    }

    #[inline(always)]
    pub fn is_string(&self) -> bool {
        matches!(self, LuaValue::String(_))
    }

    #[inline(always)]
    pub fn is_table(&self) -> bool {
        matches!(self, LuaValue::Table(_))
    }

    #[inline(always)]
    pub fn is_function(&self) -> bool {
        matches!(self, LuaValue::Function(_))
    }

    #[inline(always)]
    pub fn is_userdata(&self) -> bool {
        matches!(self, LuaValue::Userdata(_))
    }

    #[inline(always)]
    pub fn is_thread(&self) -> bool {
        matches!(self, LuaValue::Thread(_))
    }

    /// Tables, functions, userdata and threads: the kinds weak tables
    /// may hold weakly.
    #[inline]
    pub fn is_collectable(&self) -> bool {
        matches!(
            self,
            LuaValue::Table(_) | LuaValue::Function(_) | LuaValue::Userdata(_) | LuaValue::Thread(_)
        )
    }

    // ============ Truthiness (Lua semantics) ============

    /// Only nil and false are falsy
    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        !self.is_falsy()
    }

    #[inline(always)]
    pub fn is_falsy(&self) -> bool {
        matches!(self, LuaValue::Nil | LuaValue::Boolean(false))
    }

    // ============ to_X: lossy, never fails ============

    #[inline]
    pub fn to_boolean(&self) -> bool {
        self.is_truthy()
    }

    /// Integer value, or 0 when there is none.
    pub fn to_integer(&self) -> i64 {
        self.as_integer().unwrap_or(0)
    }

    /// Float value, or 0.0 when there is none.
    pub fn to_number(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }

    /// String form of any value, as `tostring` without metamethods.
    pub fn to_lua_string(&self) -> StringPtr {
        match self {
            LuaValue::String(s) => s.clone(),
            other => Rc::new(LuaString::new(other.to_string().as_bytes())),
        }
    }

    // ============ as_X: Option, with coercion ============

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            LuaValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer without coercion from floats or strings.
    pub fn as_integer_strict(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer, converting integral floats and numeric strings.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Float(f) => float_to_integer(*f),
            LuaValue::String(s) => match str2number(s.as_bytes())? {
                LuaValue::Integer(i) => Some(i),
                LuaValue::Float(f) => float_to_integer(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// Float, converting integers and numeric strings.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LuaValue::Integer(i) => Some(*i as f64),
            LuaValue::Float(f) => Some(*f),
            LuaValue::String(s) => match str2number(s.as_bytes())? {
                LuaValue::Integer(i) => Some(i as f64),
                LuaValue::Float(f) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }

    /// String contents; numbers are converted.
    pub fn as_lua_string(&self) -> Option<StringPtr> {
        match self {
            LuaValue::String(s) => Some(s.clone()),
            LuaValue::Integer(_) | LuaValue::Float(_) => Some(self.to_lua_string()),
            _ => None,
        }
    }

    /// String contents when this is a string holding valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => s.as_str(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            LuaValue::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_string_ptr(&self) -> Option<&StringPtr> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TablePtr> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionPtr> {
        match self {
            LuaValue::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_userdata(&self) -> Option<&UserdataPtr> {
        match self {
            LuaValue::Userdata(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_thread(&self) -> Option<&ThreadPtr> {
        match self {
            LuaValue::Thread(t) => Some(t),
            _ => None,
        }
    }

    // ============ check_X: Result, TypeError on mismatch ============

    pub fn check_boolean(&self) -> LuaResult<bool> {
        self.as_boolean()
            .ok_or_else(|| LuaError::type_error("boolean", self))
    }

    pub fn check_integer(&self) -> LuaResult<i64> {
        if let Some(i) = self.as_integer() {
            return Ok(i);
        }
        if self.as_number().is_some() {
            return Err(LuaError::TypeError(
                "number has no integer representation".to_owned(),
            ));
        }
        Err(LuaError::type_error("number", self))
    }

    pub fn check_number(&self) -> LuaResult<f64> {
        self.as_number()
            .ok_or_else(|| LuaError::type_error("number", self))
    }

    pub fn check_string(&self) -> LuaResult<StringPtr> {
        self.as_lua_string()
            .ok_or_else(|| LuaError::type_error("string", self))
    }

    pub fn check_table(&self) -> LuaResult<TablePtr> {
        self.as_table()
            .cloned()
            .ok_or_else(|| LuaError::type_error("table", self))
    }

    pub fn check_function(&self) -> LuaResult<FunctionPtr> {
        self.as_function()
            .cloned()
            .ok_or_else(|| LuaError::type_error("function", self))
    }

    pub fn check_userdata(&self) -> LuaResult<UserdataPtr> {
        self.as_userdata()
            .cloned()
            .ok_or_else(|| LuaError::type_error("userdata", self))
    }

    pub fn check_thread(&self) -> LuaResult<ThreadPtr> {
        self.as_thread()
            .cloned()
            .ok_or_else(|| LuaError::type_error("thread", self))
    }

    // ============ opt_X: default for nil, else check_X ============

    pub fn opt_boolean(&self, default: bool) -> LuaResult<bool> {
        if self.is_nil() {
            Ok(default)
        } else {
            self.check_boolean()
        }
    }

    pub fn opt_integer(&self, default: i64) -> LuaResult<i64> {
        if self.is_nil() {
            Ok(default)
        } else {
            self.check_integer()
        }
    }

    pub fn opt_number(&self, default: f64) -> LuaResult<f64> {
        if self.is_nil() {
            Ok(default)
        } else {
            self.check_number()
        }
    }

    pub fn opt_string(&self, default: &str) -> LuaResult<StringPtr> {
        if self.is_nil() {
            Ok(Rc::new(LuaString::new(default.as_bytes())))
        } else {
            self.check_string()
        }
    }

    pub fn opt_table(&self, default: Option<TablePtr>) -> LuaResult<Option<TablePtr>> {
        if self.is_nil() {
            Ok(default)
        } else {
            self.check_table().map(Some)
        }
    }

    // ============ Equality and hashing ============

    /// Equality without metamethods.
    pub fn raw_equals(&self, other: &LuaValue) -> bool {
        match (self, other) {
            (LuaValue::Nil, LuaValue::Nil) => true,
            (LuaValue::Boolean(a), LuaValue::Boolean(b)) => a == b,
            (LuaValue::Integer(a), LuaValue::Integer(b)) => a == b,
            // NaN != NaN
            (LuaValue::Float(a), LuaValue::Float(b)) => a == b,
            (LuaValue::Integer(i), LuaValue::Float(f)) | (LuaValue::Float(f), LuaValue::Integer(i)) => {
                float_eq_int(*f, *i)
            }
            (LuaValue::String(a), LuaValue::String(b)) => Rc::ptr_eq(a, b) || a == b,
            (LuaValue::Table(a), LuaValue::Table(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Function(a), LuaValue::Function(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Userdata(a), LuaValue::Userdata(b)) => Rc::ptr_eq(a, b),
            (LuaValue::Thread(a), LuaValue::Thread(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Hash consistent with `raw_equals`: an integral float hashes like the
    /// equal integer.
    pub fn hash_value(&self) -> u64 {
        match self {
            LuaValue::Nil => 0,
            LuaValue::Boolean(b) => mix64(*b as u64 + 1),
            LuaValue::Integer(i) => mix64(*i as u64),
            LuaValue::Float(f) => match float_to_integer(*f) {
                Some(i) => mix64(i as u64),
                None => mix64(f.to_bits()),
            },
            LuaValue::String(s) => s.cached_hash(),
            LuaValue::Table(t) => identity_hash(Rc::as_ptr(t)),
            LuaValue::Function(f) => identity_hash(Rc::as_ptr(f)),
            LuaValue::Userdata(u) => identity_hash(Rc::as_ptr(u)),
            LuaValue::Thread(t) => identity_hash(Rc::as_ptr(t)),
        }
    }

    /// Address of the shared allocation for reference kinds.
    pub fn raw_ptr_repr(&self) -> Option<usize> {
        match self {
            LuaValue::String(s) => Some(Rc::as_ptr(s) as usize),
            LuaValue::Table(t) => Some(Rc::as_ptr(t) as *const u8 as usize),
            LuaValue::Function(f) => Some(Rc::as_ptr(f) as usize),
            LuaValue::Userdata(u) => Some(Rc::as_ptr(u) as usize),
            LuaValue::Thread(t) => Some(Rc::as_ptr(t) as usize),
            _ => None,
        }
    }

    /// Normalized table key: integral floats become integers.
    /// `None` for nil and NaN, which are never valid keys.
    pub fn to_table_key(&self) -> Option<LuaValue> {
        match self {
            LuaValue::Nil => None,
            LuaValue::Float(f) if f.is_nan() => None,
            LuaValue::Float(f) => Some(match float_to_integer(*f) {
                Some(i) => LuaValue::Integer(i),
                None => LuaValue::Float(*f),
            }),
            other => Some(other.clone()),
        }
    }

    // ============ Metatable and length ============

    /// Own metatable of a table or userdata.
    pub fn metatable(&self) -> Option<TablePtr> {
        match self {
            LuaValue::Table(t) => t.borrow().get_metatable(),
            LuaValue::Userdata(u) => u.get_metatable(),
            _ => None,
        }
    }

    /// Length without metamethods: byte length of strings, border of tables.
    pub fn raw_len(&self) -> Option<usize> {
        match self {
            LuaValue::String(s) => Some(s.len()),
            LuaValue::Table(t) => Some(t.borrow().length()),
            _ => None,
        }
    }

    /// Integer floor of a number, for callers that need a position.
    pub fn floor_integer(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(i) => Some(*i),
            LuaValue::Float(f) => float_to_integer_mode(*f, F2IMode::Floor),
            _ => None,
        }
    }
}

impl PartialEq for LuaValue {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equals(other)
    }
}

// ============ Traits ============

impl fmt::Debug for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => write!(f, "{}", i),
            LuaValue::Float(n) => write!(f, "{}", fmt_float(*n)),
            LuaValue::String(s) => write!(f, "{:?}", s),
            _ => write!(
                f,
                "{}(0x{:x})",
                self.type_name(),
                self.raw_ptr_repr().unwrap_or(0)
            ),
        }
    }
}

impl fmt::Display for LuaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuaValue::Nil => write!(f, "nil"),
            LuaValue::Boolean(b) => write!(f, "{}", b),
            LuaValue::Integer(i) => f.write_str(&fmt_integer(*i)),
            LuaValue::Float(n) => f.write_str(&fmt_float(*n)),
            LuaValue::String(s) => write!(f, "{}", s),
            _ => write!(
                f,
                "{}: 0x{:x}",
                self.type_name(),
                self.raw_ptr_repr().unwrap_or(0)
            ),
        }
    }
}

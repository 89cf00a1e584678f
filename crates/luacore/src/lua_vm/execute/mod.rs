/*----------------------------------------------------------------------
  Metatable-aware operations on values

  Raw operations live on the values and tables themselves. Everything
  that can fall back to a metamethod is a method on LuaVM, split by
  concern:
  - table_ops:       index / set_index with __index and __newindex chains
  - comparison_ops:  equals / less_than / less_equal
  - arithmetic_ops:  the numeric tower with __add ... __unm fallback
  - concat:          concatenation, length and tostring

  No table borrow is held while a metamethod runs.
----------------------------------------------------------------------*/

mod arithmetic_ops;
mod comparison_ops;
mod concat;
pub mod metamethod;
mod table_ops;

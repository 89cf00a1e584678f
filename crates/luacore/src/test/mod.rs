pub mod test_metamethods;
pub mod test_table;

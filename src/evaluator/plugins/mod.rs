pub mod cast;
pub mod comparison;
pub mod in_list;
pub mod is_null;
pub mod json;
pub mod logical;

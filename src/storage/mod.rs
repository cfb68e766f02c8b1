pub mod catalog;
pub mod table;

pub use catalog::Catalog;
pub use table::{Table, TableSchema};

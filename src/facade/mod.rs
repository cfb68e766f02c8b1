pub mod database;
pub mod document;
pub mod table;

pub use database::Database;
pub use document::Document;
pub use table::Table;

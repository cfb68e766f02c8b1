pub mod error;
pub mod param;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use param::Param;
pub use types::{PkType, validate_identifier};
pub use value::{DataType, Datum};

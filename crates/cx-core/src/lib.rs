pub mod error;
pub mod types;
pub mod value;

pub use error::{CodexError, ErrorKind};
pub use types::*;
pub use value::*;

pub mod config;
pub mod convert;
pub mod emit;
pub mod error;
pub mod load;
pub mod naming;
pub mod service;
pub mod table;

pub use convert::{convert, ConvertOptions};
pub use error::{ConvertError, EmitError, LoadError};
pub use load::{FileKind, LoadOptions};
pub use table::{Cell, Number, Table};

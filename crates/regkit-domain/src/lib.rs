#![deny(clippy::all)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Value objects for the registry engine: root aliases, typed paths,
//! value payloads, and the error taxonomy. Nothing in this crate
//! touches the native store.

mod error;
mod path;
mod roots;
mod value;

pub use error::RegError;
pub use path::{RegPath, SEPARATOR};
pub use roots::RootKey;
pub use value::{ValueData, ValueType};

#![deny(clippy::all)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Registry CRUD engine: scoped native handles over a pluggable
//! store backend, key operations, value accessors, and lazy
//! enumeration.
//!
//! Every operation opens a handle, performs one native call, and
//! releases the handle before returning, on success and on error
//! alike. Nothing is cached across calls and nothing retries; callers
//! see a result, a boolean, or a classified [`RegError`].

pub mod backend;
mod registry;
mod value;

pub use backend::memory::MemoryBackend;
#[cfg(windows)]
pub use backend::windows::WindowsBackend;
pub use backend::{Access, OsCode, RawHandle, StoreBackend};
pub use registry::{Registry, SubKeys, Values};
pub use value::RegValue;

pub use regkit_domain::{RegError, RegPath, RootKey, ValueData, ValueType, SEPARATOR};

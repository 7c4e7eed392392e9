//! The native store surface the engine is built on: one trait with
//! the handle-based calls, raw OS codes for failures, and the two
//! implementations (live Windows registry, in-memory emulation).

use regkit_domain::{RootKey, ValueData};

pub mod memory;
#[cfg(windows)]
pub mod windows;

/// Raw error code as returned by the native store. Classification
/// into [`regkit_domain::RegError`] happens immediately above the
/// backend, never inside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OsCode(pub i32);

impl OsCode {
    /// ERROR_FILE_NOT_FOUND: the requested key or value does not
    /// exist. Distinct from every genuine failure.
    pub const NOT_FOUND: OsCode = OsCode(2);
    /// ERROR_ACCESS_DENIED. Also what the store reports for a
    /// non-recursive delete of a key that still has subkeys.
    pub const ACCESS_DENIED: OsCode = OsCode(5);
    /// ERROR_NO_MORE_ITEMS: enumeration exhausted. Expected
    /// termination, not a failure.
    pub const NO_MORE_ITEMS: OsCode = OsCode(259);

    #[must_use]
    pub fn is_not_found(self) -> bool {
        self == Self::NOT_FOUND
    }

    #[must_use]
    pub fn is_no_more_items(self) -> bool {
        self == Self::NO_MORE_ITEMS
    }
}

/// Access requested when opening a key. Opening for write is what
/// mutation calls require; reads request no more than they need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Opaque open-key token. Its meaning is private to the backend that
/// issued it; the engine only threads it through and closes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawHandle(pub u64);

/// Handle-based API of the underlying store. One native call per
/// method; lookups are case-insensitive in the store itself.
///
/// Callers own the handle lifecycle: every `open`/`create` success
/// must be paired with exactly one `close` on every exit path.
pub trait StoreBackend {
    /// Opens an existing key.
    fn open(&self, root: RootKey, path: &str, access: Access) -> Result<RawHandle, OsCode>;

    /// Opens with write access, creating the key and any missing
    /// ancestors in one atomic call.
    fn create(&self, root: RootKey, path: &str) -> Result<RawHandle, OsCode>;

    fn close(&self, handle: RawHandle);

    /// Deletes the named child of an open key. Fails when the child
    /// still has subkeys of its own.
    fn delete_key(&self, parent: RawHandle, name: &str) -> Result<(), OsCode>;

    /// Name of the subkey at `index`, or `NO_MORE_ITEMS` past the end.
    fn enum_key_at(&self, handle: RawHandle, index: u32) -> Result<String, OsCode>;

    /// Name and payload of the value at `index`, or `NO_MORE_ITEMS`
    /// past the end.
    fn enum_value_at(&self, handle: RawHandle, index: u32) -> Result<(String, ValueData), OsCode>;

    fn query_value(&self, handle: RawHandle, name: &str) -> Result<ValueData, OsCode>;

    /// Writes a payload under its variant's native tag.
    fn set_value(&self, handle: RawHandle, name: &str, data: &ValueData) -> Result<(), OsCode>;

    fn delete_value(&self, handle: RawHandle, name: &str) -> Result<(), OsCode>;
}

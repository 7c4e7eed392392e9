use std::fmt;

use tracing::{debug, trace};

use regkit_domain::{RegError, RegPath};

use crate::backend::memory::MemoryBackend;
#[cfg(windows)]
use crate::backend::windows::WindowsBackend;
use crate::backend::{Access, OsCode, StoreBackend};
use crate::value::RegValue;

pub(crate) fn store_failure(code: OsCode, context: impl ToString) -> RegError {
    RegError::StoreFailure {
        code: code.0,
        context: context.to_string(),
    }
}

/// Scoped native handle. Closing happens on drop, which covers every
/// exit path of the operation holding it, early error returns
/// included. Guards are never cached, pooled, or handed across
/// threads.
pub(crate) struct KeyGuard<'a, B: StoreBackend> {
    backend: &'a B,
    handle: crate::backend::RawHandle,
}

impl<B: StoreBackend> KeyGuard<'_, B> {
    pub(crate) fn handle(&self) -> crate::backend::RawHandle {
        self.handle
    }
}

impl<B: StoreBackend> Drop for KeyGuard<'_, B> {
    fn drop(&mut self) {
        self.backend.close(self.handle);
    }
}

/// Client over one native store backend.
///
/// Stateless between calls: every operation opens a handle, performs
/// its native call, and releases the handle before returning. Calls
/// block for the duration of the native call; concurrent access to
/// the same underlying key is serialized by the store itself, not by
/// this layer, and recursive delete is not atomic with respect to a
/// concurrent creator.
pub struct Registry<B: StoreBackend> {
    backend: B,
}

impl Registry<MemoryBackend> {
    /// Engine over the in-memory emulation. What the tests use, and a
    /// usable fake for consumers on any host.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }
}

#[cfg(windows)]
impl Registry<WindowsBackend> {
    /// Engine over the live Windows registry.
    #[must_use]
    pub fn native() -> Self {
        Self::with_backend(WindowsBackend)
    }
}

impl<B: StoreBackend> Registry<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Opens `path`, classifying failures. With `required = false` a
    /// missing key comes back as `Ok(None)` and the caller treats it
    /// as nothing to do; with `required = true` it is a `NotFound`
    /// error. Any other native code is a `StoreFailure`.
    pub(crate) fn open_key(
        &self,
        path: &RegPath,
        access: Access,
        required: bool,
    ) -> Result<Option<KeyGuard<'_, B>>, RegError> {
        trace!(path = %path, ?access, "open key");
        match self.backend.open(path.root(), path.relative(), access) {
            Ok(handle) => Ok(Some(KeyGuard {
                backend: &self.backend,
                handle,
            })),
            Err(code) if code.is_not_found() => {
                if required {
                    Err(RegError::NotFound(path.to_string()))
                } else {
                    Ok(None)
                }
            }
            Err(code) => Err(store_failure(code, path)),
        }
    }

    fn open_required(&self, path: &RegPath, access: Access) -> Result<KeyGuard<'_, B>, RegError> {
        self.open_key(path, access, true)?
            .ok_or_else(|| RegError::NotFound(path.to_string()))
    }

    pub(crate) fn create_guard(&self, path: &RegPath) -> Result<KeyGuard<'_, B>, RegError> {
        match self.backend.create(path.root(), path.relative()) {
            Ok(handle) => Ok(KeyGuard {
                backend: &self.backend,
                handle,
            }),
            Err(code) => Err(store_failure(code, path)),
        }
    }

    /// True when the key exists. Only the not-found code folds to
    /// `false`; a permission or resource failure is not an answer and
    /// propagates instead.
    pub fn key_exists(&self, path: &RegPath) -> Result<bool, RegError> {
        Ok(self.open_key(path, Access::Read, false)?.is_some())
    }

    /// Creates the key and every missing ancestor in one native call.
    /// Idempotent: creating an existing key succeeds as a no-op.
    pub fn create_key(&self, path: &RegPath) -> Result<(), RegError> {
        debug!(path = %path, "create key");
        let _guard = self.create_guard(path)?;
        Ok(())
    }

    /// Deletes the key. With `recurse`, subkeys go first, depth-first
    /// (sibling order carries no meaning); without it, a key that
    /// still has subkeys fails with the store's own code. An absent
    /// key, or one whose parent is absent, is a successful no-op.
    pub fn delete_key(&self, path: &RegPath, recurse: bool) -> Result<(), RegError> {
        debug!(path = %path, recurse, "delete key");
        let Some(parent) = path.parent() else {
            // Root keys are permanent fixtures of the store.
            return Err(store_failure(OsCode::ACCESS_DENIED, path));
        };

        if recurse {
            // Collect before deleting: removal shifts enumeration
            // indices under a live cursor.
            let children = match self.subkeys(path) {
                Ok(iter) => iter.collect::<Result<Vec<_>, _>>()?,
                Err(RegError::NotFound(_)) => return Ok(()),
                Err(err) => return Err(err),
            };
            for child in children {
                self.delete_key(&child, true)?;
            }
        }

        let Some(guard) = self.open_key(&parent, Access::Write, false)? else {
            return Ok(());
        };
        match self.backend.delete_key(guard.handle(), path.name()) {
            Ok(()) => Ok(()),
            Err(code) if code.is_not_found() => Ok(()),
            Err(code) => Err(store_failure(code, path)),
        }
    }

    /// Lazy subkey enumeration. One read handle stays open for the
    /// whole walk and is released when the iterator is dropped,
    /// however iteration ends. The sequence is one-shot; call again
    /// to re-enumerate from scratch.
    pub fn subkeys(&self, path: &RegPath) -> Result<SubKeys<'_, B>, RegError> {
        let guard = self.open_required(path, Access::Read)?;
        Ok(SubKeys {
            owner: path.clone(),
            guard,
            index: 0,
            done: false,
        })
    }

    /// Lazy enumeration of the values attached to the key, yielding
    /// accessors whose mirrors are already populated. Same handle and
    /// termination discipline as [`Registry::subkeys`].
    pub fn values(&self, path: &RegPath) -> Result<Values<'_, B>, RegError> {
        let guard = self.open_required(path, Access::Read)?;
        Ok(Values {
            registry: self,
            owner: path.clone(),
            guard,
            index: 0,
            done: false,
        })
    }

    /// Accessor for the named value under `path`. Construction alone
    /// performs no store access.
    #[must_use]
    pub fn value(&self, path: &RegPath, name: impl Into<String>) -> RegValue<'_, B> {
        RegValue::new(self, path.clone(), name.into())
    }
}

/// Iterator over the subkeys of one key.
///
/// Exhaustion is the store's no-more-data signal and ends iteration
/// cleanly; any other mid-stream code surfaces once as an `Err` item
/// and then ends it.
pub struct SubKeys<'a, B: StoreBackend> {
    owner: RegPath,
    guard: KeyGuard<'a, B>,
    index: u32,
    done: bool,
}

impl<B: StoreBackend> Iterator for SubKeys<'_, B> {
    type Item = Result<RegPath, RegError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.guard.backend.enum_key_at(self.guard.handle(), self.index) {
            Ok(name) => {
                self.index += 1;
                Some(Ok(self.owner.join(&name)))
            }
            Err(code) if code.is_no_more_items() => {
                self.done = true;
                None
            }
            Err(code) => {
                self.done = true;
                Some(Err(store_failure(code, &self.owner)))
            }
        }
    }
}

impl<B: StoreBackend> fmt::Debug for SubKeys<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubKeys")
            .field("owner", &self.owner)
            .field("index", &self.index)
            .field("done", &self.done)
            .finish()
    }
}

/// Iterator over the values of one key.
pub struct Values<'a, B: StoreBackend> {
    registry: &'a Registry<B>,
    owner: RegPath,
    guard: KeyGuard<'a, B>,
    index: u32,
    done: bool,
}

impl<'a, B: StoreBackend> Iterator for Values<'a, B> {
    type Item = Result<RegValue<'a, B>, RegError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self
            .guard
            .backend
            .enum_value_at(self.guard.handle(), self.index)
        {
            Ok((name, data)) => {
                self.index += 1;
                Some(Ok(RegValue::enumerated(
                    self.registry,
                    self.owner.clone(),
                    name,
                    data,
                )))
            }
            Err(code) if code.is_no_more_items() => {
                self.done = true;
                None
            }
            Err(code) => {
                self.done = true;
                Some(Err(store_failure(code, &self.owner)))
            }
        }
    }
}

impl<B: StoreBackend> fmt::Debug for Values<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Values")
            .field("owner", &self.owner)
            .field("index", &self.index)
            .field("done", &self.done)
            .finish()
    }
}

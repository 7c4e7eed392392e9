use std::fmt;

use tracing::debug;

use regkit_domain::{RegError, RegPath, ValueData, ValueType};

use crate::backend::{Access, StoreBackend};
use crate::registry::{store_failure, Registry};

/// Accessor for one named value under a key.
///
/// Carries a local mirror of the last payload seen by `get` or `set`.
/// The mirror is plain state on this instance for the caller's
/// convenience; store operations never consult it, so a deleted value
/// still answers `exists` truthfully through a fresh lookup.
pub struct RegValue<'a, B: StoreBackend> {
    registry: &'a Registry<B>,
    owner: RegPath,
    name: String,
    data: Option<ValueData>,
}

impl<'a, B: StoreBackend> RegValue<'a, B> {
    pub(crate) fn new(registry: &'a Registry<B>, owner: RegPath, name: String) -> Self {
        Self {
            registry,
            owner,
            name,
            data: None,
        }
    }

    // Enumeration hands back payloads it already read; keep them.
    pub(crate) fn enumerated(
        registry: &'a Registry<B>,
        owner: RegPath,
        name: String,
        data: ValueData,
    ) -> Self {
        Self {
            registry,
            owner,
            name,
            data: Some(data),
        }
    }

    #[must_use]
    pub fn owner(&self) -> &RegPath {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mirror of the last payload seen by `get` or `set`; `None`
    /// until one of those completes.
    #[must_use]
    pub fn data(&self) -> Option<&ValueData> {
        self.data.as_ref()
    }

    /// Tag of the mirrored payload; `None` until a `get`/`set`, or
    /// when the mirror holds a payload outside the closed tag set.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        self.data.as_ref().and_then(ValueData::value_type)
    }

    /// True when the value can currently be read. Attempts a `get`;
    /// only `NotFound` folds to `false`.
    pub fn exists(&mut self) -> Result<bool, RegError> {
        match self.get() {
            Ok(_) => Ok(true),
            Err(RegError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Reads the payload and updates the mirror. A missing owner key
    /// or missing value is `NotFound`; an expanding-string payload
    /// comes back as its own variant, never as a plain string.
    pub fn get(&mut self) -> Result<ValueData, RegError> {
        let guard = self
            .registry
            .open_key(&self.owner, Access::Read, true)?
            .ok_or_else(|| RegError::NotFound(self.describe()))?;
        match self
            .registry
            .backend()
            .query_value(guard.handle(), &self.name)
        {
            Ok(data) => {
                self.data = Some(data.clone());
                Ok(data)
            }
            Err(code) if code.is_not_found() => Err(RegError::NotFound(self.describe())),
            Err(code) => Err(store_failure(code, self.describe())),
        }
    }

    /// Writes the payload under its inferred tag, creating the owner
    /// key (with any missing ancestors) first. Payloads with no
    /// inference rule are refused rather than forwarded untyped.
    pub fn set(&mut self, data: impl Into<ValueData>) -> Result<(), RegError> {
        let data = data.into();
        if data.value_type().is_none() {
            return Err(RegError::UnsupportedValueType);
        }
        self.write(data)
    }

    /// Writes under an explicit tag; retags within the payload class
    /// (plain string as expanding and vice versa), refuses the rest.
    pub fn set_typed(&mut self, data: impl Into<ValueData>, ty: ValueType) -> Result<(), RegError> {
        let data = data.into().retag(ty)?;
        self.write(data)
    }

    fn write(&mut self, data: ValueData) -> Result<(), RegError> {
        debug!(owner = %self.owner, name = %self.name, "set value");
        // Create-with-ancestors doubles as the write-mode open.
        let guard = self.registry.create_guard(&self.owner)?;
        match self
            .registry
            .backend()
            .set_value(guard.handle(), &self.name, &data)
        {
            Ok(()) => {
                self.data = Some(data);
                Ok(())
            }
            Err(code) => Err(store_failure(code, self.describe())),
        }
    }

    /// Best-effort removal: a missing owner key or missing value is a
    /// successful no-op; everything else propagates. The accessor
    /// stays usable afterwards.
    pub fn delete(&mut self) -> Result<(), RegError> {
        debug!(owner = %self.owner, name = %self.name, "delete value");
        let Some(guard) = self.registry.open_key(&self.owner, Access::Write, false)? else {
            return Ok(());
        };
        match self
            .registry
            .backend()
            .delete_value(guard.handle(), &self.name)
        {
            Ok(()) => Ok(()),
            Err(code) if code.is_not_found() => Ok(()),
            Err(code) => Err(store_failure(code, self.describe())),
        }
    }

    fn describe(&self) -> String {
        format!("value '{}' under {}", self.name, self.owner)
    }
}

impl<B: StoreBackend> fmt::Debug for RegValue<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegValue")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("data", &self.data)
            .finish()
    }
}

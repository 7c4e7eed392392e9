use crate::RegError;

/// Native value type tags in the closed set this engine understands.
/// Discriminants are the store's own REG_* constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ValueType {
    /// REG_SZ.
    String = 1,
    /// REG_EXPAND_SZ: the payload contains substitutable placeholders
    /// understood by the store.
    ExpandingString = 2,
    /// REG_BINARY.
    Binary = 3,
    /// REG_DWORD, 32-bit little-endian.
    Dword = 4,
}

impl ValueType {
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::String),
            2 => Some(Self::ExpandingString),
            3 => Some(Self::Binary),
            4 => Some(Self::Dword),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_raw(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::ExpandingString => "expand-string",
            Self::Binary => "binary",
            Self::Dword => "dword",
        }
    }
}

/// Typed payload of one registry value.
///
/// `ExpandingString` is deliberately a separate variant rather than a
/// flag on `String`: the tag selects environment-substitution
/// semantics in the store and must survive a set/get round-trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueData {
    String(String),
    ExpandingString(String),
    Binary(Vec<u8>),
    Dword(u32),
    /// Payload read back with a tag outside the closed set. Kept
    /// opaque for display; never chosen by write-side type inference.
    Unknown { kind: u32, bytes: Vec<u8> },
}

impl ValueData {
    /// Inferred native tag; `None` for `Unknown`, which has no
    /// inference rule and must not be forwarded to the store untyped.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::String(_) => Some(ValueType::String),
            Self::ExpandingString(_) => Some(ValueType::ExpandingString),
            Self::Binary(_) => Some(ValueType::Binary),
            Self::Dword(_) => Some(ValueType::Dword),
            Self::Unknown { .. } => None,
        }
    }

    /// Applies an explicit tag. Retagging is only meaningful within
    /// the same payload class (a plain string may be written as an
    /// expanding string and vice versa); anything else is
    /// `UnsupportedValueType`.
    pub fn retag(self, ty: ValueType) -> Result<Self, RegError> {
        match (self, ty) {
            (Self::String(s) | Self::ExpandingString(s), ValueType::String) => Ok(Self::String(s)),
            (Self::String(s) | Self::ExpandingString(s), ValueType::ExpandingString) => {
                Ok(Self::ExpandingString(s))
            }
            (Self::Binary(b), ValueType::Binary) => Ok(Self::Binary(b)),
            (Self::Dword(d), ValueType::Dword) => Ok(Self::Dword(d)),
            _ => Err(RegError::UnsupportedValueType),
        }
    }
}

impl From<&str> for ValueData {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ValueData {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<u32> for ValueData {
    fn from(d: u32) -> Self {
        Self::Dword(d)
    }
}

impl From<Vec<u8>> for ValueData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

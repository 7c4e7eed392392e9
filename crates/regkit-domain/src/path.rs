use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::{RegError, RootKey};

/// Segment separator in rendered paths.
pub const SEPARATOR: char = '\\';

/// Location of one key in the registry hierarchy: a root plus a
/// relative segment path.
///
/// Immutable value object. Storage is case-preserving, identity is
/// case-insensitive, matching the store's own collation; existence is
/// never decided from the string alone, only by asking the store.
#[derive(Clone, Debug)]
pub struct RegPath {
    root: RootKey,
    relative: String,
}

impl RegPath {
    /// Builds a path from parts without parsing. Trailing separators
    /// are trimmed so the relative path never ends in one.
    #[must_use]
    pub fn new(root: RootKey, relative: impl Into<String>) -> Self {
        let mut relative = relative.into();
        while relative.ends_with(SEPARATOR) {
            relative.pop();
        }
        Self { root, relative }
    }

    /// Parses `ALIAS\segment\segment`. The first segment must be a
    /// recognized root alias; a bare alias denotes the root key itself.
    pub fn parse(raw: &str) -> Result<Self, RegError> {
        match raw.split_once(SEPARATOR) {
            Some((alias, rest)) => Ok(Self::new(RootKey::resolve(alias)?, rest)),
            None => Ok(Self::new(RootKey::resolve(raw)?, "")),
        }
    }

    #[must_use]
    pub fn root(&self) -> RootKey {
        self.root
    }

    /// Relative path under the root; empty for the root key itself.
    #[must_use]
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// True when this path denotes the root key itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// The same location under a different root, without re-parsing.
    #[must_use]
    pub fn with_root(&self, root: RootKey) -> Self {
        Self {
            root,
            relative: self.relative.clone(),
        }
    }

    /// Child path one segment down. Pure path algebra; the store is
    /// not consulted.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        if self.relative.is_empty() {
            Self::new(self.root, segment)
        } else {
            Self::new(self.root, format!("{}{SEPARATOR}{segment}", self.relative))
        }
    }

    /// Last segment of the relative path; empty for a root path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.relative.rsplit(SEPARATOR).next().unwrap_or("")
    }

    /// Enclosing key, or `None` when this path is already a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.relative.is_empty() {
            return None;
        }
        let head = match self.relative.rsplit_once(SEPARATOR) {
            Some((head, _)) => head,
            None => "",
        };
        Some(Self::new(self.root, head))
    }
}

impl fmt::Display for RegPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative.is_empty() {
            f.write_str(self.root.alias())
        } else {
            write!(f, "{}{SEPARATOR}{}", self.root.alias(), self.relative)
        }
    }
}

impl FromStr for RegPath {
    type Err = RegError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

// Identity is case-insensitive over (root, relative). The local fold
// approximates the store's collation for value-object comparison only;
// lookups and existence checks always go through the store itself.
fn folded(path: &str) -> impl Iterator<Item = char> + '_ {
    path.chars().flat_map(char::to_lowercase)
}

impl PartialEq for RegPath {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && folded(&self.relative).eq(folded(&other.relative))
    }
}

impl Eq for RegPath {}

impl Hash for RegPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.root.hash(state);
        for c in folded(&self.relative) {
            c.hash(state);
        }
    }
}

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::RegError;

/// The closed set of top-level registry namespaces. Every path is
/// anchored at exactly one of these; no other roots exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RootKey {
    ClassesRoot,
    CurrentConfig,
    CurrentUser,
    LocalMachine,
    Users,
}

const ROOTS: [(RootKey, &str, &str); 5] = [
    (RootKey::ClassesRoot, "HKEY_CLASSES_ROOT", "HKCR"),
    (RootKey::CurrentConfig, "HKEY_CURRENT_CONFIG", "HKCC"),
    (RootKey::CurrentUser, "HKEY_CURRENT_USER", "HKCU"),
    (RootKey::LocalMachine, "HKEY_LOCAL_MACHINE", "HKLM"),
    (RootKey::Users, "HKEY_USERS", "HKU"),
];

fn alias_table() -> &'static HashMap<&'static str, RootKey> {
    static TABLE: OnceLock<HashMap<&'static str, RootKey>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        for (root, long, short) in ROOTS {
            table.insert(long, root);
            table.insert(short, root);
        }
        table
    })
}

impl RootKey {
    pub const ALL: [RootKey; 5] = [
        RootKey::ClassesRoot,
        RootKey::CurrentConfig,
        RootKey::CurrentUser,
        RootKey::LocalMachine,
        RootKey::Users,
    ];

    /// Resolves a long (`HKEY_CURRENT_USER`) or short (`HKCU`) alias.
    /// Aliases are fixed tokens, matched case-sensitively; anything
    /// outside the closed set is `UnrecognizedRoot`.
    pub fn resolve(alias: &str) -> Result<Self, RegError> {
        alias_table()
            .get(alias)
            .copied()
            .ok_or_else(|| RegError::UnrecognizedRoot(alias.to_string()))
    }

    /// Canonical short alias used for display.
    #[must_use]
    pub fn alias(self) -> &'static str {
        match self {
            RootKey::ClassesRoot => "HKCR",
            RootKey::CurrentConfig => "HKCC",
            RootKey::CurrentUser => "HKCU",
            RootKey::LocalMachine => "HKLM",
            RootKey::Users => "HKU",
        }
    }

    /// Long-form alias.
    #[must_use]
    pub fn long_alias(self) -> &'static str {
        match self {
            RootKey::ClassesRoot => "HKEY_CLASSES_ROOT",
            RootKey::CurrentConfig => "HKEY_CURRENT_CONFIG",
            RootKey::CurrentUser => "HKEY_CURRENT_USER",
            RootKey::LocalMachine => "HKEY_LOCAL_MACHINE",
            RootKey::Users => "HKEY_USERS",
        }
    }
}

//! End-to-end engine behavior over the in-memory store emulation.

use regkit_core::{MemoryBackend, RegError, RegPath, Registry, ValueData, ValueType};

fn registry() -> Registry<MemoryBackend> {
    Registry::in_memory()
}

fn path(raw: &str) -> RegPath {
    RegPath::parse(raw).expect("test path parses")
}

fn assert_no_open_handles(reg: &Registry<MemoryBackend>) {
    assert_eq!(reg.backend().open_handles(), 0, "handle leaked");
}

#[test]
fn create_is_idempotent_and_visible() {
    let reg = registry();
    let key = path(r"HKCU\Software\regkit\test\newKey");

    assert!(!reg.key_exists(&key).unwrap());
    reg.create_key(&key).unwrap();
    assert!(reg.key_exists(&key).unwrap());
    reg.create_key(&key).unwrap();
    assert!(reg.key_exists(&key).unwrap());
    assert_no_open_handles(&reg);
}

#[test]
fn create_makes_missing_ancestors() {
    let reg = registry();
    reg.create_key(&path(r"HKCU\a\b\c")).unwrap();
    assert!(reg.key_exists(&path(r"HKCU\a")).unwrap());
    assert!(reg.key_exists(&path(r"HKCU\a\b")).unwrap());
}

#[test]
fn keys_are_found_under_any_case() {
    let reg = registry();
    reg.create_key(&path(r"HKCU\Software\regkit\newKey")).unwrap();
    assert!(reg.key_exists(&path(r"HKCU\SOFTWARE\REGKIT\NEWKEY")).unwrap());
    assert!(reg.key_exists(&path(r"HKCU\software\regkit\newkey")).unwrap());
}

#[test]
fn delete_of_absent_key_is_a_no_op() {
    let reg = registry();
    let key = path(r"HKCU\Software\regkit\gone");

    reg.create_key(&key).unwrap();
    reg.delete_key(&key, false).unwrap();
    assert!(!reg.key_exists(&key).unwrap());
    // Again, now absent: still fine.
    reg.delete_key(&key, false).unwrap();
    // And with the whole parent chain absent too.
    reg.delete_key(&path(r"HKCU\no\such\parent\key"), false).unwrap();
    assert_no_open_handles(&reg);
}

#[test]
fn non_recursive_delete_of_populated_key_propagates_the_failure() {
    let reg = registry();
    reg.create_key(&path(r"HKCU\A\B\C")).unwrap();

    let err = reg.delete_key(&path(r"HKCU\A"), false).unwrap_err();
    assert!(matches!(err, RegError::StoreFailure { .. }), "got {err:?}");
    assert!(reg.key_exists(&path(r"HKCU\A\B\C")).unwrap());
    assert_no_open_handles(&reg);
}

#[test]
fn recursive_delete_removes_the_whole_subtree() {
    let reg = registry();
    reg.create_key(&path(r"HKCU\A\B\C")).unwrap();
    reg.create_key(&path(r"HKCU\A\B2")).unwrap();

    reg.delete_key(&path(r"HKCU\A"), true).unwrap();
    for gone in [r"HKCU\A", r"HKCU\A\B", r"HKCU\A\B\C", r"HKCU\A\B2"] {
        assert!(!reg.key_exists(&path(gone)).unwrap(), "{gone} survived");
    }
    assert_no_open_handles(&reg);
}

#[test]
fn recursive_delete_of_absent_key_is_a_no_op() {
    let reg = registry();
    reg.delete_key(&path(r"HKCU\never\created"), true).unwrap();
    assert_no_open_handles(&reg);
}

#[test]
fn root_keys_cannot_be_deleted() {
    let reg = registry();
    let err = reg.delete_key(&path("HKCU"), true).unwrap_err();
    assert!(matches!(err, RegError::StoreFailure { .. }));
}

#[test]
fn subkeys_of_an_empty_key_is_an_empty_sequence() {
    let reg = registry();
    reg.create_key(&path(r"HKCU\Software\regkit\empty")).unwrap();

    let found: Vec<_> = reg
        .subkeys(&path(r"HKCU\Software\regkit\empty"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(found.is_empty());
    assert_no_open_handles(&reg);
}

#[test]
fn subkeys_yields_each_child_exactly_once() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");
    for name in ["subkey1", "subkey2", "subkey3"] {
        reg.create_key(&base.join(name)).unwrap();
    }

    let mut names: Vec<String> = reg
        .subkeys(&base)
        .unwrap()
        .map(|key| key.map(|k| k.name().to_string()))
        .collect::<Result<_, _>>()
        .unwrap();
    names.sort();
    assert_eq!(names, ["subkey1", "subkey2", "subkey3"]);
    assert_no_open_handles(&reg);
}

#[test]
fn subkeys_of_a_missing_key_is_not_found() {
    let reg = registry();
    let err = reg.subkeys(&path(r"HKCU\missing")).unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
    assert_no_open_handles(&reg);
}

#[test]
fn subkeys_surfaces_a_failure_when_the_key_vanishes_mid_walk() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\live");
    for name in ["a", "b", "c"] {
        reg.create_key(&base.join(name)).unwrap();
    }

    let mut iter = reg.subkeys(&base).unwrap();
    iter.next().unwrap().unwrap();
    reg.delete_key(&base, true).unwrap();

    let item = iter.next().expect("a vanished key is a failure, not exhaustion");
    assert!(
        matches!(item, Err(RegError::StoreFailure { .. })),
        "got {item:?}"
    );
    assert!(iter.next().is_none(), "iteration ends after one error");
    drop(iter);
    assert_no_open_handles(&reg);
}

#[test]
fn values_surfaces_a_failure_when_the_key_vanishes_mid_walk() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\live");
    reg.value(&base, "one").set(1u32).unwrap();
    reg.value(&base, "two").set(2u32).unwrap();

    let mut iter = reg.values(&base).unwrap();
    iter.next().unwrap().unwrap();
    reg.delete_key(&base, true).unwrap();

    let failed = iter
        .next()
        .expect("a vanished key is a failure, not exhaustion")
        .is_err();
    assert!(failed);
    assert!(iter.next().is_none());
    drop(iter);
    assert_no_open_handles(&reg);
}

#[test]
fn doubled_separators_never_alias_a_real_key() {
    let reg = registry();
    reg.create_key(&path(r"HKCU\a\b")).unwrap();

    assert!(!reg.key_exists(&path(r"HKCU\a\\b")).unwrap());
    let err = reg.create_key(&path(r"HKCU\a\\c")).unwrap_err();
    assert!(matches!(err, RegError::StoreFailure { .. }), "got {err:?}");
    assert_no_open_handles(&reg);
}

#[test]
fn abandoning_enumeration_early_still_releases_the_handle() {
    let reg = registry();
    let base = path(r"HKCU\Software\many");
    for i in 0..5 {
        reg.create_key(&base.join(&format!("k{i}"))).unwrap();
    }

    {
        let mut iter = reg.subkeys(&base).unwrap();
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.parent().unwrap(), base);
        assert_eq!(reg.backend().open_handles(), 1);
        // Dropped mid-walk here.
    }
    assert_no_open_handles(&reg);
}

#[test]
fn values_enumeration_reports_names_and_payloads() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");
    reg.value(&base, "AnotherValue").set("x").unwrap();
    reg.value(&base, "Count").set(3u32).unwrap();

    let mut seen: Vec<(String, ValueData)> = reg
        .values(&base)
        .unwrap()
        .map(|value| {
            value.map(|v| {
                (
                    v.name().to_string(),
                    v.data().cloned().expect("enumerated mirror populated"),
                )
            })
        })
        .collect::<Result<_, _>>()
        .unwrap();
    seen.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        seen,
        [
            ("AnotherValue".to_string(), ValueData::String("x".into())),
            ("Count".to_string(), ValueData::Dword(3)),
        ]
    );
    assert_no_open_handles(&reg);
}

#[test]
fn value_round_trips_for_every_supported_variant() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");
    let cases = [
        ("bin", ValueData::Binary(vec![0x00, 0xff, 0x10])),
        ("plain", ValueData::String("test".into())),
        ("expand", ValueData::ExpandingString("%TEMP%\\x".into())),
        ("word", ValueData::Dword(0xdead_beef)),
    ];

    for (name, data) in cases {
        let mut value = reg.value(&base, name);
        value.set(data.clone()).unwrap();
        assert_eq!(value.data(), Some(&data));

        let mut fresh = reg.value(&base, name);
        assert_eq!(fresh.get().unwrap(), data);
    }
    assert_no_open_handles(&reg);
}

#[test]
fn expanding_strings_stay_distinguishable_from_plain_strings() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");

    reg.value(&base, "nonExpandValue").set("test").unwrap();
    let mut plain = reg.value(&base, "nonExpandValue");
    plain.get().unwrap();
    assert_eq!(plain.value_type(), Some(ValueType::String));

    reg.value(&base, "expandValue")
        .set(ValueData::ExpandingString("test".into()))
        .unwrap();
    let mut expanded = reg.value(&base, "expandValue");
    assert_eq!(
        expanded.get().unwrap(),
        ValueData::ExpandingString("test".into())
    );
    assert_eq!(expanded.value_type(), Some(ValueType::ExpandingString));
}

#[test]
fn set_creates_the_owner_key_when_absent() {
    let reg = registry();
    let owner = path(r"HKCU\Software\regkit\fresh\deeper");

    assert!(!reg.key_exists(&owner).unwrap());
    reg.value(&owner, "v").set("made").unwrap();
    assert!(reg.key_exists(&owner).unwrap());
    assert_eq!(reg.value(&owner, "v").get().unwrap(), ValueData::String("made".into()));
}

#[test]
fn set_typed_retags_strings_and_refuses_cross_class_tags() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");

    let mut value = reg.value(&base, "expandValue");
    value.set_typed("%PATH%", ValueType::ExpandingString).unwrap();
    assert_eq!(value.value_type(), Some(ValueType::ExpandingString));
    assert_eq!(
        reg.value(&base, "expandValue").get().unwrap(),
        ValueData::ExpandingString("%PATH%".into())
    );

    let err = reg.value(&base, "bad").set_typed(7u32, ValueType::String);
    assert_eq!(err, Err(RegError::UnsupportedValueType));
}

#[test]
fn untyped_payloads_are_refused_at_the_boundary() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");
    let err = reg.value(&base, "odd").set(ValueData::Unknown {
        kind: 7, // REG_MULTI_SZ, outside the closed set
        bytes: vec![0, 0],
    });
    assert_eq!(err, Err(RegError::UnsupportedValueType));
    // Refused before any native call: the owner was not created.
    assert!(!reg.key_exists(&base).unwrap());
}

#[test]
fn get_on_missing_key_or_value_is_not_found_and_exists_is_false() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");

    // Owner key missing entirely.
    let mut value = reg.value(&base, "v");
    assert!(value.get().unwrap_err().is_not_found());
    assert!(!value.exists().unwrap());

    // Owner present, value missing.
    reg.create_key(&base).unwrap();
    let mut value = reg.value(&base, "v");
    assert!(value.get().unwrap_err().is_not_found());
    assert!(!value.exists().unwrap());
    assert_no_open_handles(&reg);
}

#[test]
fn values_are_found_under_any_case() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");
    reg.value(&base, "newValue").set("test").unwrap();

    let mut upper = reg.value(&base, "NEWVALUE");
    assert!(upper.exists().unwrap());
    assert_eq!(upper.get().unwrap(), ValueData::String("test".into()));
    upper.delete().unwrap();
    assert!(!reg.value(&base, "newValue").exists().unwrap());
}

#[test]
fn value_delete_is_idempotent_and_leaves_the_accessor_usable() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");

    let mut value = reg.value(&base, "newValue");
    value.set("test").unwrap();
    assert!(value.exists().unwrap());

    value.delete().unwrap();
    assert!(!value.exists().unwrap());
    value.delete().unwrap();

    // Owner key missing entirely: still a no-op.
    let mut orphan = reg.value(&path(r"HKCU\no\such\key"), "v");
    orphan.delete().unwrap();
    assert_no_open_handles(&reg);
}

#[test]
fn deleting_a_key_drops_its_values() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");
    reg.value(&base, "v").set(1u32).unwrap();

    reg.delete_key(&base, false).unwrap();
    reg.create_key(&base).unwrap();
    assert!(!reg.value(&base, "v").exists().unwrap());
}

#[test]
fn mirror_tracks_set_and_survives_delete() {
    let reg = registry();
    let base = path(r"HKCU\Software\regkit\test");

    let mut value = reg.value(&base, "v");
    assert!(value.data().is_none());
    assert!(value.value_type().is_none());

    value.set(42u32).unwrap();
    assert_eq!(value.data(), Some(&ValueData::Dword(42)));
    assert_eq!(value.value_type(), Some(ValueType::Dword));

    // The mirror is caller-side state, not a cache: the store answers
    // from a fresh lookup after a delete.
    value.delete().unwrap();
    assert_eq!(value.data(), Some(&ValueData::Dword(42)));
    assert!(!reg.value(&base, "v").exists().unwrap());
}

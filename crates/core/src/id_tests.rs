// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn parses_valid_group_slash_name() {
    let id = UnitId::parse("network/dns-config").unwrap();
    assert_eq!(id.group(), "network");
    assert_eq!(id.name(), "dns-config");
    assert_eq!(id.as_str(), "network/dns-config");
}

#[test]
fn rejects_missing_slash() {
    let err = UnitId::parse("nodash").unwrap_err();
    assert!(matches!(err, crate::error::CoreError::InvalidUnitId { .. }));
}

#[test]
fn rejects_empty_group() {
    assert!(UnitId::parse("/name").is_err());
}

#[test]
fn rejects_empty_name() {
    assert!(UnitId::parse("group/").is_err());
}

#[test]
fn rejects_extra_slash_in_name() {
    assert!(UnitId::parse("group/sub/name").is_err());
}

#[test]
fn is_case_sensitive() {
    let a = UnitId::parse("Group/Name").unwrap();
    let b = UnitId::parse("group/name").unwrap();
    assert_ne!(a, b);
}

#[test]
fn borrows_as_str_for_hashmap_lookup() {
    use std::collections::HashMap;
    let mut map: HashMap<UnitId, u32> = HashMap::new();
    map.insert(UnitId::parse("g/n").unwrap(), 1);
    assert_eq!(map.get("g/n"), Some(&1));
}

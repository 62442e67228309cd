// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use soma_core::test_support::simple_type;
use soma_core::{FieldMapping, NamespaceType, TypeDefinition, TypeRegistry};

#[test]
fn merges_type_fragments_under_type_names() {
    let merged = merge_mappings(&[
        Arc::new(simple_type("dashboard")),
        Arc::new(simple_type("visualization")),
    ])
    .unwrap();

    assert!(merged.properties.contains_key("dashboard"));
    assert!(merged.properties.contains_key("visualization"));
    // Root fields always present
    for root in ["id", "type", "namespace", "updated_at", "references", "migrationVersion"] {
        assert!(merged.properties.contains_key(root), "missing root field {root}");
    }
}

#[test]
fn type_colliding_with_root_field_conflicts() {
    let bad = TypeDefinition::new(
        "references",
        NamespaceType::Agnostic,
        FieldMapping::keyword(),
    );
    let err = merge_mappings(&[Arc::new(bad)]).unwrap_err();
    assert_eq!(err.field, "references");
    assert_eq!(err.first, "root");
    assert_eq!(err.second, "references");
}

#[test]
fn identical_duplicate_fragments_do_not_conflict() {
    let merged = merge_mappings(&[
        Arc::new(simple_type("dashboard")),
        Arc::new(simple_type("dashboard")),
    ])
    .unwrap();
    assert!(merged.properties.contains_key("dashboard"));
}

#[test]
fn differing_duplicate_fragments_conflict() {
    let a = simple_type("dashboard");
    let b = TypeDefinition::new("dashboard", NamespaceType::Single, FieldMapping::keyword());
    let err = merge_mappings(&[Arc::new(a), Arc::new(b)]).unwrap_err();
    assert_eq!(err.field, "dashboard");
    assert_eq!(err.first, "dashboard");
}

#[test]
fn hash_ignores_meta() {
    let merged = merge_mappings(&[Arc::new(simple_type("dashboard"))]).unwrap();
    let bare_hash = mapping_hash(&merged).unwrap();

    let mut stamped = merged;
    stamped.meta = Some(soma_core::MappingMeta {
        migration_hash: bare_hash.clone(),
    });
    assert_eq!(mapping_hash(&stamped).unwrap(), bare_hash);
}

#[test]
fn hash_changes_when_a_field_changes() {
    let a = merge_mappings(&[Arc::new(simple_type("dashboard"))]).unwrap();
    let b = merge_mappings(&[Arc::new(TypeDefinition::new(
        "dashboard",
        NamespaceType::Single,
        FieldMapping::object([("title", FieldMapping::keyword())]),
    ))])
    .unwrap();
    assert_ne!(mapping_hash(&a).unwrap(), mapping_hash(&b).unwrap());
}

proptest! {
    /// Registration order never changes the merged output bytes.
    #[test]
    fn merge_is_order_independent(mut names in proptest::collection::vec("[a-z]{1,8}", 1..8)) {
        names.sort();
        names.dedup();

        let registry_fwd = TypeRegistry::new();
        for name in &names {
            registry_fwd.register(simple_type(name)).unwrap();
        }
        let registry_rev = TypeRegistry::new();
        for name in names.iter().rev() {
            registry_rev.register(simple_type(name)).unwrap();
        }

        let a = merge_mappings(&registry_fwd.all_types()).unwrap();
        let b = merge_mappings(&registry_rev.all_types()).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        prop_assert_eq!(mapping_hash(&a).unwrap(), mapping_hash(&b).unwrap());
    }
}

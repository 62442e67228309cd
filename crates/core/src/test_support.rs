// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared builders for tests in this crate and downstream crates
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::document::SavedObject;
use crate::mapping::FieldMapping;
use crate::registry::{NamespaceType, TypeDefinition, TypeRegistry};
use serde_json::json;
use std::sync::Arc;

/// A single-namespace type whose mapping is `{title: text}`
pub fn simple_type(name: &str) -> TypeDefinition {
    TypeDefinition::new(
        name,
        NamespaceType::Single,
        FieldMapping::object([("title", FieldMapping::text())]),
    )
}

/// A document of `ty` with a title attribute and no applied migrations
pub fn titled_doc(ty: &str, id: &str) -> SavedObject {
    SavedObject::new(ty, id).with_attributes(json!({"title": id}))
}

/// A sealed registry containing the given definitions
pub fn sealed_registry<I>(defs: I) -> Arc<TypeRegistry>
where
    I: IntoIterator<Item = TypeDefinition>,
{
    let registry = TypeRegistry::new();
    for def in defs {
        #[allow(clippy::expect_used)]
        registry.register(def).expect("duplicate type in fixture");
    }
    registry.seal();
    Arc::new(registry)
}

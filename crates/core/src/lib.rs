// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! soma-core: data model for the saved-object migration engine

pub mod clock;
pub mod document;
pub mod mapping;
pub mod registry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use document::{Reference, SavedObject};
pub use mapping::{Dynamic, FieldKind, FieldMapping, IndexMapping, MappingMeta};
pub use registry::{
    NamespaceType, RegistryError, TransformFn, TypeDefinition, TypeRegistry,
};

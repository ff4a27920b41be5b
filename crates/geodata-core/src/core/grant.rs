// crates/geodata-core/src/core/grant.rs
// ============================================================================
// Module: Permission Grants
// Description: Resolved attribute and operation grants for a role-set.
// Purpose: Provide side-effect-free grant union over immutable role grants.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A grant is the resolved set of visible attributes and operation flags for
//! one role-set against one dataset. Grants from multiple roles combine by
//! union of attributes and logical OR of flags; the combination is a pure
//! function returning a new immutable grant and never mutates shared
//! configuration state.
//!
//! After the OR-union a consistency closure applies: `writable` is implied by
//! all four CRUD flags together, and each CRUD flag is implied by `writable`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Dataset operation requested by a client.
///
/// # Invariants
/// - Variants are stable for metric labels and permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Read one feature or list features.
    Read,
    /// Create a new feature.
    Create,
    /// Update an existing feature.
    Update,
    /// Delete an existing feature.
    Delete,
}

impl Operation {
    /// Returns a stable label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Returns whether the operation mutates the store.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Read)
    }
}

// ============================================================================
// SECTION: Grant
// ============================================================================

/// Resolved grant for a (role-set, dataset) pair.
///
/// # Invariants
/// - `attributes` never expands beyond the union of the contributing roles'
///   visible sets.
/// - Flags satisfy the consistency closure established by
///   [`Grant::union_of`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Grant {
    /// Visible attribute names.
    pub attributes: BTreeSet<String>,
    /// Whether the dataset is readable.
    pub readable: bool,
    /// Whether new features may be created.
    pub creatable: bool,
    /// Whether existing features may be updated.
    pub updatable: bool,
    /// Whether existing features may be deleted.
    pub deletable: bool,
    /// Whether the dataset is writable.
    pub writable: bool,
}

impl Grant {
    /// Returns a grant allowing nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns a read-only grant exposing the given attributes.
    #[must_use]
    pub fn read_only(attributes: impl IntoIterator<Item = String>) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
            readable: true,
            ..Self::default()
        }
    }

    /// Combines per-role grants into the grant for the whole role-set.
    ///
    /// Attributes union; flags OR. The result then closes over consistency:
    /// all four CRUD flags imply `writable`, and `writable` implies each
    /// CRUD flag.
    #[must_use]
    pub fn union_of<'a>(grants: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut merged = Self::none();
        for grant in grants {
            merged.attributes.extend(grant.attributes.iter().cloned());
            merged.readable |= grant.readable;
            merged.creatable |= grant.creatable;
            merged.updatable |= grant.updatable;
            merged.deletable |= grant.deletable;
            merged.writable |= grant.writable;
        }
        merged.close_consistency();
        merged
    }

    /// Applies the writable/CRUD consistency closure in place.
    fn close_consistency(&mut self) {
        self.writable |=
            self.creatable && self.readable && self.updatable && self.deletable;
        self.creatable |= self.writable;
        self.readable |= self.writable;
        self.updatable |= self.writable;
        self.deletable |= self.writable;
    }

    /// Returns whether any operation is permitted at all.
    #[must_use]
    pub const fn permits_anything(&self) -> bool {
        self.readable || self.creatable || self.updatable || self.deletable
    }

    /// Returns whether the given operation is permitted.
    #[must_use]
    pub const fn permits(&self, operation: Operation) -> bool {
        match operation {
            Operation::Read => self.readable,
            Operation::Create => self.creatable,
            Operation::Update => self.updatable,
            Operation::Delete => self.deletable,
        }
    }

    /// Returns whether the attribute is visible under this grant.
    #[must_use]
    pub fn permits_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }
}

//! Stored entity shapes: pages, layouts and widgets.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Primitive identity type assigned by a repository.
pub trait Identity:
    Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static
{
    /// Build the identity for the `n`th inserted row (1-based).
    fn from_sequence(n: u64) -> Self;

    /// Position of this identity in the insertion sequence.
    fn to_sequence(self) -> u64;
}

macro_rules! impl_identity {
    ($($ty:ty),*) => {$(
        impl Identity for $ty {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            fn from_sequence(n: u64) -> Self {
                n as $ty
            }

            #[allow(clippy::cast_sign_loss)]
            fn to_sequence(self) -> u64 {
                self as u64
            }
        }
    )*};
}

impl_identity!(i32, i64, u32, u64);

/// A row that a [`Repository`](super::Repository) can hold.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    type Id: Identity;

    /// Table name, used in diagnostics and by persistent backends.
    const TABLE: &'static str;

    fn id(&self) -> Self::Id;

    fn set_id(&mut self, id: Self::Id);

    /// `(column, value)` pairs that must be unique across all rows.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Publication status shared by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Active,
    Disabled,
    Deleted,
}

impl EntityStatus {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

// =============================================================================
// Page
// =============================================================================

/// A routable page. `path` is stored normalized and is the view lookup key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub path: String,
    pub body: String,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
    /// Wrapping layout; stored but not applied when rendering.
    #[serde(default)]
    pub layout_id: Option<i32>,
}

impl Entity for Page {
    type Id = i32;
    const TABLE: &'static str = "pages";

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone()), ("path", self.path.clone())]
    }
}

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub remark: String,
    pub content: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Entity for Layout {
    type Id = i32;
    const TABLE: &'static str = "layouts";

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }
}

// =============================================================================
// Widget
// =============================================================================

/// Named template fragment rendered inline by `{% render name:entity %}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Widget {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub status: EntityStatus,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Entity for Widget {
    type Id = i32;
    const TABLE: &'static str = "widgets";

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone())]
    }
}

//! Hook kinds, pipelines and capability sets.
//!
//! [`ResourceHook`] names every point at which a resource definition can be
//! called. [`ResourcePipeline`] names the request that triggered execution.
//! [`HookCapabilities`] is the per-type descriptor of which hooks a
//! definition implements; the executor consults it instead of inspecting the
//! definition at runtime.

use core::fmt;

use strata_resource::ResourceType;

use crate::error::ConfigurationError;

// ─────────────────────────────────────────────────────────────────────────────
// ResourceHook
// ─────────────────────────────────────────────────────────────────────────────

/// A lifecycle hook a resource definition may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceHook {
    /// Before new resources are persisted. May filter or replace the root set.
    BeforeCreate,
    /// Before resources are read; receives no resources.
    BeforeRead,
    /// Before resources are updated. Receives a diffable set.
    BeforeUpdate,
    /// Before resources are deleted. May filter the root set.
    BeforeDelete,
    /// Before resources are assigned to a relationship of another resource.
    BeforeUpdateRelationship,
    /// Before a relationship changes as a side effect of another change.
    BeforeImplicitUpdateRelationship,
    /// Before resources leave the server. May filter or replace them.
    OnReturn,
    /// After resources were created.
    AfterCreate,
    /// After resources were read.
    AfterRead,
    /// After resources were updated.
    AfterUpdate,
    /// After resources were deleted, with the outcome.
    AfterDelete,
    /// After resources were assigned to a relationship of another resource.
    AfterUpdateRelationship,
}

impl ResourceHook {
    /// Every hook, in declaration order.
    pub const ALL: [ResourceHook; 12] = [
        ResourceHook::BeforeCreate,
        ResourceHook::BeforeRead,
        ResourceHook::BeforeUpdate,
        ResourceHook::BeforeDelete,
        ResourceHook::BeforeUpdateRelationship,
        ResourceHook::BeforeImplicitUpdateRelationship,
        ResourceHook::OnReturn,
        ResourceHook::AfterCreate,
        ResourceHook::AfterRead,
        ResourceHook::AfterUpdate,
        ResourceHook::AfterDelete,
        ResourceHook::AfterUpdateRelationship,
    ];

    /// Returns the hook name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ResourceHook::BeforeCreate => "BeforeCreate",
            ResourceHook::BeforeRead => "BeforeRead",
            ResourceHook::BeforeUpdate => "BeforeUpdate",
            ResourceHook::BeforeDelete => "BeforeDelete",
            ResourceHook::BeforeUpdateRelationship => "BeforeUpdateRelationship",
            ResourceHook::BeforeImplicitUpdateRelationship => "BeforeImplicitUpdateRelationship",
            ResourceHook::OnReturn => "OnReturn",
            ResourceHook::AfterCreate => "AfterCreate",
            ResourceHook::AfterRead => "AfterRead",
            ResourceHook::AfterUpdate => "AfterUpdate",
            ResourceHook::AfterDelete => "AfterDelete",
            ResourceHook::AfterUpdateRelationship => "AfterUpdateRelationship",
        }
    }

    /// Returns whether loading of persisted values can be configured for this hook.
    ///
    /// `BeforeImplicitUpdateRelationship` always works on persisted values and
    /// is not configurable.
    #[must_use]
    pub const fn supports_database_values(self) -> bool {
        matches!(
            self,
            ResourceHook::BeforeUpdate
                | ResourceHook::BeforeUpdateRelationship
                | ResourceHook::BeforeDelete
        )
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for ResourceHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourcePipeline
// ─────────────────────────────────────────────────────────────────────────────

/// The request that triggered hook execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourcePipeline {
    /// `GET /articles`
    Get,
    /// `GET /articles/1`
    GetSingle,
    /// `GET /articles/1/relationships/author`
    GetRelationship,
    /// `POST /articles`
    Post,
    /// `PATCH /articles/1`
    Patch,
    /// `PATCH /articles/1/relationships/author`
    PatchRelationship,
    /// `DELETE /articles/1`
    Delete,
    /// Bulk create.
    PostBulk,
    /// Bulk update.
    PatchBulk,
    /// Bulk delete.
    DeleteBulk,
}

impl ResourcePipeline {
    /// Returns true for read pipelines.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(
            self,
            ResourcePipeline::Get | ResourcePipeline::GetSingle | ResourcePipeline::GetRelationship
        )
    }

    /// Returns true for pipelines that create resources.
    ///
    /// Roots of a create pipeline have no persisted state yet.
    #[must_use]
    pub const fn is_create(self) -> bool {
        matches!(self, ResourcePipeline::Post | ResourcePipeline::PostBulk)
    }

    /// Returns true for pipelines that update resources.
    #[must_use]
    pub const fn is_update(self) -> bool {
        matches!(
            self,
            ResourcePipeline::Patch | ResourcePipeline::PatchRelationship | ResourcePipeline::PatchBulk
        )
    }

    /// Returns true for pipelines that delete resources.
    #[must_use]
    pub const fn is_delete(self) -> bool {
        matches!(self, ResourcePipeline::Delete | ResourcePipeline::DeleteBulk)
    }

    /// Returns true for bulk pipelines.
    #[must_use]
    pub const fn is_bulk(self) -> bool {
        matches!(
            self,
            ResourcePipeline::PostBulk | ResourcePipeline::PatchBulk | ResourcePipeline::DeleteBulk
        )
    }

    /// Returns true when the response carries at most one primary resource.
    #[must_use]
    pub const fn expects_single(self) -> bool {
        matches!(self, ResourcePipeline::GetSingle)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookCapabilities
// ─────────────────────────────────────────────────────────────────────────────

/// Which hooks a resource definition implements.
///
/// Also carries per-hook overrides for loading persisted values; hooks without
/// an override follow [`HooksOptions::load_database_values`](crate::options::HooksOptions).
///
/// # Example
///
/// ```
/// use strata_hooks::hook::{HookCapabilities, ResourceHook};
///
/// let capabilities = HookCapabilities::none()
///     .with(ResourceHook::BeforeUpdate)
///     .with(ResourceHook::OnReturn)
///     .load_database_values(ResourceHook::BeforeUpdate, true);
///
/// assert!(capabilities.contains(ResourceHook::OnReturn));
/// assert!(!capabilities.contains(ResourceHook::AfterRead));
/// assert_eq!(capabilities.database_values(ResourceHook::BeforeUpdate), Some(true));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HookCapabilities {
    implemented: u16,
    database_values_enabled: u16,
    database_values_disabled: u16,
}

impl HookCapabilities {
    /// No hooks implemented.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            implemented: 0,
            database_values_enabled: 0,
            database_values_disabled: 0,
        }
    }

    /// Marks `hook` as implemented.
    #[must_use]
    pub const fn with(mut self, hook: ResourceHook) -> Self {
        self.implemented |= hook.bit();
        self
    }

    /// Overrides whether persisted values are loaded for `hook`.
    #[must_use]
    pub const fn load_database_values(mut self, hook: ResourceHook, enabled: bool) -> Self {
        if enabled {
            self.database_values_enabled |= hook.bit();
            self.database_values_disabled &= !hook.bit();
        } else {
            self.database_values_disabled |= hook.bit();
            self.database_values_enabled &= !hook.bit();
        }
        self
    }

    /// Returns whether `hook` is implemented.
    #[must_use]
    pub const fn contains(self, hook: ResourceHook) -> bool {
        self.implemented & hook.bit() != 0
    }

    /// Returns the database-value override for `hook`, if any.
    #[must_use]
    pub const fn database_values(self, hook: ResourceHook) -> Option<bool> {
        if self.database_values_enabled & hook.bit() != 0 {
            Some(true)
        } else if self.database_values_disabled & hook.bit() != 0 {
            Some(false)
        } else {
            None
        }
    }

    /// Returns true when no hook is implemented.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.implemented == 0
    }

    /// Returns the implemented hooks.
    pub fn iter(self) -> impl Iterator<Item = ResourceHook> {
        ResourceHook::ALL
            .into_iter()
            .filter(move |hook| self.contains(*hook))
    }

    /// Checks that overrides are only set on hooks that support them.
    pub(crate) fn validate(self, resource_type: &ResourceType) -> Result<(), ConfigurationError> {
        let overridden = self.database_values_enabled | self.database_values_disabled;
        match ResourceHook::ALL
            .into_iter()
            .find(|hook| overridden & hook.bit() != 0 && !hook.supports_database_values())
        {
            Some(hook) => Err(ConfigurationError::DatabaseValuesNotSupported {
                resource_type: resource_type.clone(),
                hook,
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<ResourceHook> for HookCapabilities {
    fn from_iter<I: IntoIterator<Item = ResourceHook>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

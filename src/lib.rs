//! A resource hook engine for JSON:API servers.
//!
//! Strata walks the tree of resources touched by a request, calls the
//! lifecycle hooks that each resource type declares, and merges what the hooks
//! return back into the tree before and after persistence.
//!
//! ```
//! use std::sync::Arc;
//!
//! use strata::prelude::*;
//!
//! struct People;
//!
//! impl ResourceDefinition for People {
//!     fn capabilities(&self) -> HookCapabilities {
//!         HookCapabilities::none().with(ResourceHook::OnReturn)
//!     }
//!
//!     fn on_return(
//!         &self,
//!         resources: &ResourceHashSet,
//!         _pipeline: ResourcePipeline,
//!     ) -> Result<Vec<Resource>, HookError> {
//!         // Hide people who opted out.
//!         Ok(resources
//!             .iter()
//!             .filter(|person| person.attribute("hidden").is_none())
//!             .cloned()
//!             .collect())
//!     }
//! }
//!
//! let graph = ResourceGraph::builder()
//!     .add_resource("articles", |r| {
//!         r.attribute("title").has_one("author", "people");
//!     })
//!     .add_resource("people", |r| {
//!         r.attribute("name").attribute("hidden");
//!     })
//!     .build()
//!     .unwrap();
//! let definitions = ResourceDefinitions::new();
//! definitions.register("people", People).unwrap();
//! let executor = ResourceHookExecutor::new(Arc::new(graph), Arc::new(definitions));
//!
//! let article = ResourceKey::new("articles", "1");
//! let tree = executor
//!     .run_read(&"articles".into(), ResourcePipeline::GetSingle, Some("1"), &[], || {
//!         let mut tree = ResourceTree::from_roots([Resource::new("articles", "1")]);
//!         tree.relate_one(
//!             &article,
//!             "author",
//!             Some(Resource::new("people", "9").with_attribute("hidden", true)),
//!         );
//!         Ok(tree)
//!     })
//!     .unwrap();
//!
//! assert_eq!(
//!     tree.relationship(&article, "author"),
//!     Some(&RelationshipValue::ToOne(None))
//! );
//! ```

pub use strata_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use strata_internal::prelude::*;
}

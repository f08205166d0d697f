//! Integration tests for the create, read, update and delete hook cycles.
//!
//! Every test builds a [`ResourceHookExecutor`] over the blog graph from
//! `test_utils` and observes hook calls through a shared [`Recorder`].


use std::sync::Arc;

use strata_hooks::{
    ConfigurationError, HookCapabilities, HookError, ResourceDefinition, ResourceHashSet,
    ResourceHook, ResourceHookExecutor, ResourcePipeline, TargetedFields,
};
use strata_resource::{MemoryStore, RelationshipValue, Resource, ResourceTree};
use test_utils::{
    Recorder, TestDefinition, article_with_author_and_tags, articles, executor,
    executor_with_store, ids, key, shared_author, slot_ids,
};

fn root_ids(tree: &ResourceTree) -> Vec<String> {
    tree.roots().iter().map(|k| k.id().to_owned()).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NO HOOKS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn types_without_hooks_are_never_called_and_tree_is_unchanged() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder),
        TestDefinition::new("people", &recorder),
        TestDefinition::new("tags", &recorder),
    ]);
    let mut tree = article_with_author_and_tags();
    let original = tree.clone();

    executor.before_create(&mut tree, ResourcePipeline::Post).unwrap();
    executor.after_create(&tree, ResourcePipeline::Post).unwrap();
    executor.after_read(&tree, ResourcePipeline::Get).unwrap();
    executor.on_return(&mut tree, ResourcePipeline::Get).unwrap();

    assert!(recorder.is_empty());
    assert_eq!(tree, original);
}

#[test]
fn unregistered_types_are_skipped() {
    let executor = executor(Vec::new());
    let mut tree = article_with_author_and_tags();
    let original = tree.clone();

    executor
        .before_update(&mut tree, ResourcePipeline::Patch, &TargetedFields::new())
        .unwrap();
    executor.before_delete(&mut tree, ResourcePipeline::Delete).unwrap();

    assert_eq!(tree, original);
}

#[test]
fn empty_tree_is_a_no_op() {
    let recorder = Recorder::new();
    let executor = executor(vec![TestDefinition::new("articles", &recorder).implementing_all()]);
    let mut tree = ResourceTree::new();

    executor.before_create(&mut tree, ResourcePipeline::Post).unwrap();
    executor.on_return(&mut tree, ResourcePipeline::Get).unwrap();

    assert!(recorder.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// CREATE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn before_create_result_replaces_roots_in_returned_order() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder)
            .implementing(&[ResourceHook::BeforeCreate])
            .rejecting(&["2"])
            .reversing()
            .stamping("status", "draft"),
    ]);
    let mut tree = articles(3);

    executor.before_create(&mut tree, ResourcePipeline::PostBulk).unwrap();

    assert_eq!(root_ids(&tree), ["3", "1"]);
    for article in tree.root_resources() {
        assert_eq!(article.attribute("status"), Some(&serde_json::json!("draft")));
    }
    let calls = recorder.calls_of("articles", ResourceHook::BeforeCreate);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ids, ids(&["1", "2", "3"]));
}

#[test]
fn pruned_to_one_relationship_becomes_null() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("people", &recorder)
            .implementing(&[ResourceHook::BeforeUpdateRelationship])
            .rejecting(&["9"]),
    ]);
    let mut tree = article_with_author_and_tags();
    let article = key("articles", "1");
    let tags_before = tree.relationship(&article, "tags").cloned();

    executor.before_create(&mut tree, ResourcePipeline::Post).unwrap();

    assert_eq!(
        tree.relationship(&article, "author"),
        Some(&RelationshipValue::ToOne(None))
    );
    assert_eq!(tree.relationship(&article, "tags").cloned(), tags_before);

    let calls = recorder.calls_of("people", ResourceHook::BeforeUpdateRelationship);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ids, ids(&["9"]));
    assert_eq!(calls[0].detail, ["people.articles"]);
}

#[test]
fn relationship_dictionary_uses_the_relationship_when_no_inverse_exists() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("tags", &recorder).implementing(&[ResourceHook::BeforeUpdateRelationship]),
    ]);
    let mut tree = article_with_author_and_tags();

    executor.before_create(&mut tree, ResourcePipeline::Post).unwrap();

    let calls = recorder.calls_of("tags", ResourceHook::BeforeUpdateRelationship);
    assert_eq!(calls[0].ids, ids(&["a", "b"]));
    assert_eq!(calls[0].detail, ["articles.tags"]);
}

#[test]
fn descent_continues_from_the_pruned_layer() {
    let recorder = Recorder::new();
    let build = || {
        let mut tree = article_with_author_and_tags();
        tree.relate_many(&key("people", "9"), "friends", [Resource::new("people", "10")]);
        tree
    };

    let permissive = executor(vec![
        TestDefinition::new("people", &recorder).implementing(&[ResourceHook::BeforeUpdateRelationship]),
    ]);
    permissive
        .before_create(&mut build(), ResourcePipeline::Post)
        .unwrap();
    let calls = recorder.calls_of("people", ResourceHook::BeforeUpdateRelationship);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].ids, ids(&["10"]));
    assert_eq!(calls[1].detail, ["people.friends"]);

    let recorder = Recorder::new();
    let strict = executor(vec![
        TestDefinition::new("people", &recorder)
            .implementing(&[ResourceHook::BeforeUpdateRelationship])
            .rejecting(&["9"]),
    ]);
    strict.before_create(&mut build(), ResourcePipeline::Post).unwrap();
    assert_eq!(
        recorder
            .calls_of("people", ResourceHook::BeforeUpdateRelationship)
            .len(),
        1
    );
}

#[test]
fn after_create_fires_relationship_hooks_on_nested_layers() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[ResourceHook::AfterCreate]),
        TestDefinition::new("people", &recorder).implementing(&[ResourceHook::AfterUpdateRelationship]),
    ]);
    let tree = article_with_author_and_tags();

    executor.after_create(&tree, ResourcePipeline::Post).unwrap();

    assert_eq!(
        recorder.labels(),
        ["articles:AfterCreate", "people:AfterUpdateRelationship"]
    );
    assert_eq!(recorder.calls()[1].detail, ["people.articles"]);
}

#[test]
fn run_create_orders_before_persist_after_and_return() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[
            ResourceHook::BeforeCreate,
            ResourceHook::AfterCreate,
            ResourceHook::OnReturn,
        ]),
        TestDefinition::new("people", &recorder).implementing(&[
            ResourceHook::BeforeUpdateRelationship,
            ResourceHook::AfterUpdateRelationship,
            ResourceHook::OnReturn,
        ]),
    ]);

    let mut calls_at_persist = 0;
    let created = executor
        .run_create(article_with_author_and_tags(), ResourcePipeline::Post, |tree| {
            calls_at_persist = recorder.calls().len();
            Ok(tree.clone())
        })
        .unwrap();

    assert_eq!(calls_at_persist, 2);
    assert_eq!(
        recorder.labels(),
        [
            "articles:BeforeCreate",
            "people:BeforeUpdateRelationship",
            "articles:AfterCreate",
            "people:AfterUpdateRelationship",
            "articles:OnReturn",
            "people:OnReturn",
        ]
    );
    assert_eq!(root_ids(&created), ["1"]);
}

#[test]
fn user_errors_propagate_unchanged_and_stop_the_cycle() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder)
            .implementing(&[ResourceHook::BeforeCreate, ResourceHook::AfterCreate])
            .failing_on(ResourceHook::BeforeCreate),
    ]);

    let mut persisted = false;
    let err = executor
        .run_create(articles(1), ResourcePipeline::Post, |tree| {
            persisted = true;
            Ok(tree.clone())
        })
        .unwrap_err();

    assert!(err.is_user());
    assert_eq!(err.to_string(), "articles refused BeforeCreate");
    assert!(!persisted);
    assert_eq!(recorder.labels(), ["articles:BeforeCreate"]);
}

struct Impostor;

impl ResourceDefinition for Impostor {
    fn capabilities(&self) -> HookCapabilities {
        HookCapabilities::none().with(ResourceHook::BeforeCreate)
    }

    fn before_create(
        &self,
        _resources: &ResourceHashSet,
        _pipeline: ResourcePipeline,
    ) -> Result<Vec<Resource>, HookError> {
        Ok(vec![Resource::new("people", "1")])
    }
}

#[test]
fn resources_of_another_type_are_an_invalid_response() {
    let definitions = strata_hooks::ResourceDefinitions::new();
    definitions.register("articles", Impostor).unwrap();
    let executor = ResourceHookExecutor::new(test_utils::blog_graph(), Arc::new(definitions));
    let mut tree = articles(1);

    let err = executor
        .before_create(&mut tree, ResourcePipeline::Post)
        .unwrap_err();

    assert!(matches!(
        err,
        HookError::InvalidHookResponse {
            hook: ResourceHook::BeforeCreate,
            ..
        }
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// READ
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn before_read_fires_root_then_each_included_type_once() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[ResourceHook::BeforeRead]),
        TestDefinition::new("people", &recorder).implementing(&[ResourceHook::BeforeRead]),
        TestDefinition::new("tags", &recorder).implementing(&[ResourceHook::BeforeRead]),
    ]);
    let includes = vec![
        vec!["author".to_owned(), "articles".to_owned()],
        vec!["tags".to_owned()],
        vec!["author".to_owned()],
    ];

    executor
        .before_read(&"articles".into(), ResourcePipeline::GetSingle, Some("1"), &includes)
        .unwrap();

    assert_eq!(
        recorder.labels(),
        ["articles:BeforeRead", "people:BeforeRead", "tags:BeforeRead"]
    );
    let calls = recorder.calls();
    assert_eq!(calls[0].detail, ["included=false", "id=1"]);
    assert_eq!(calls[1].detail, ["included=true"]);
}

#[test]
fn unknown_include_is_a_configuration_error_before_any_hook() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[ResourceHook::BeforeRead]),
    ]);

    let err = executor
        .before_read(
            &"articles".into(),
            ResourcePipeline::Get,
            None,
            &[vec!["editor".to_owned()]],
        )
        .unwrap_err();

    assert!(matches!(
        err,
        HookError::Configuration(ConfigurationError::UnknownRelationship { .. })
    ));
    assert!(recorder.is_empty());
}

#[test]
fn after_read_marks_nested_layers_as_included() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[ResourceHook::AfterRead]),
        TestDefinition::new("people", &recorder).implementing(&[ResourceHook::AfterRead]),
        TestDefinition::new("tags", &recorder).implementing(&[ResourceHook::AfterRead]),
    ]);

    executor
        .after_read(&article_with_author_and_tags(), ResourcePipeline::Get)
        .unwrap();

    let calls = recorder.calls();
    assert_eq!(
        recorder.labels(),
        ["articles:AfterRead", "people:AfterRead", "tags:AfterRead"]
    );
    assert_eq!(calls[0].detail, ["included=false"]);
    assert_eq!(calls[2].ids, ids(&["a", "b"]));
    assert_eq!(calls[2].detail, ["included=true"]);
}

#[test]
fn invalid_database_value_override_surfaces_on_first_use() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).with_capabilities(
            HookCapabilities::none()
                .with(ResourceHook::AfterRead)
                .load_database_values(ResourceHook::AfterRead, true),
        ),
    ]);

    let err = executor
        .after_read(&articles(1), ResourcePipeline::Get)
        .unwrap_err();

    assert!(matches!(
        err,
        HookError::Configuration(ConfigurationError::DatabaseValuesNotSupported { .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// UPDATE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn update_relationship_returning_nothing_empties_the_parent_collection() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("tags", &recorder)
            .implementing(&[ResourceHook::BeforeUpdateRelationship])
            .rejecting(&["10"]),
    ]);
    let mut tree = articles(1);
    let article = key("articles", "1");
    tree.relate_many(&article, "tags", [Resource::new("tags", "10")]);

    executor
        .before_update(&mut tree, ResourcePipeline::Patch, &TargetedFields::new())
        .unwrap();

    assert_eq!(
        tree.relationship(&article, "tags"),
        Some(&RelationshipValue::ToMany(Vec::new()))
    );
}

#[test]
fn rejected_relationship_target_stays_unassigned_when_reached_again_deeper() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("people", &recorder)
            .implementing(&[ResourceHook::BeforeUpdateRelationship])
            .rejecting(&["8"]),
    ]);

    let mut updated = shared_author();
    executor
        .before_update(&mut updated, ResourcePipeline::Patch, &TargetedFields::new())
        .unwrap();
    let mut created = shared_author();
    executor.before_create(&mut created, ResourcePipeline::Post).unwrap();

    for tree in [&updated, &created] {
        assert_eq!(
            tree.relationship(&key("articles", "1"), "author"),
            Some(&RelationshipValue::ToOne(None))
        );
        assert_eq!(slot_ids(tree, &key("articles", "2"), "author"), ["9"]);
        assert_eq!(
            tree.relationship(&key("people", "9"), "friends"),
            Some(&RelationshipValue::ToMany(Vec::new()))
        );
        assert!(!tree.reachable().contains(&key("people", "8")));
    }

    let calls = recorder.calls_of("people", ResourceHook::BeforeUpdateRelationship);
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.ids == ids(&["8", "9"])));
}

#[test]
fn before_update_receives_persisted_values_when_enabled() {
    let store = Arc::new(MemoryStore::new());
    store.insert(Resource::new("articles", "1").with_attribute("title", "old"));
    let recorder = Recorder::new();
    let executor = executor_with_store(
        vec![
            TestDefinition::new("articles", &recorder).with_capabilities(
                HookCapabilities::none()
                    .with(ResourceHook::BeforeUpdate)
                    .load_database_values(ResourceHook::BeforeUpdate, true),
            ),
        ],
        store,
    );
    let mut tree = ResourceTree::from_roots([
        Resource::new("articles", "1").with_attribute("title", "new"),
        Resource::new("articles", "2").with_attribute("title", "fresh"),
    ]);

    executor
        .before_update(
            &mut tree,
            ResourcePipeline::PatchBulk,
            &TargetedFields::new().with_attribute("title"),
        )
        .unwrap();

    let calls = recorder.calls_of("articles", ResourceHook::BeforeUpdate);
    assert_eq!(calls[0].detail, ["1<-old", "2<--"]);
}

#[test]
fn diffs_are_unavailable_without_persisted_values() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[ResourceHook::BeforeUpdate]),
    ]);
    let mut tree = articles(1);

    executor
        .before_update(&mut tree, ResourcePipeline::Patch, &TargetedFields::new())
        .unwrap();

    assert_eq!(recorder.calls()[0].detail, ["no-diffs"]);
}

#[test]
fn targeted_relationships_limit_relationship_hooks() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("people", &recorder).implementing(&[ResourceHook::BeforeUpdateRelationship]),
        TestDefinition::new("tags", &recorder).implementing(&[ResourceHook::BeforeUpdateRelationship]),
    ]);
    let mut tree = article_with_author_and_tags();

    executor
        .before_update(
            &mut tree,
            ResourcePipeline::Patch,
            &TargetedFields::new().with_relationship("tags"),
        )
        .unwrap();

    assert_eq!(recorder.labels(), ["tags:BeforeUpdateRelationship"]);
}

#[test]
fn run_update_runs_after_update_on_the_persisted_tree() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder)
            .implementing(&[ResourceHook::BeforeUpdate, ResourceHook::AfterUpdate])
            .rejecting(&["2"]),
    ]);

    let updated = executor
        .run_update(
            articles(2),
            ResourcePipeline::PatchBulk,
            &TargetedFields::new(),
            |tree| Ok(tree.clone()),
        )
        .unwrap();

    assert_eq!(root_ids(&updated), ["1"]);
    assert_eq!(
        recorder.calls_of("articles", ResourceHook::AfterUpdate)[0].ids,
        ids(&["1"])
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// DELETE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn before_delete_subset_is_what_gets_deleted() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder)
            .implementing(&[ResourceHook::BeforeDelete, ResourceHook::AfterDelete])
            .rejecting(&["2"]),
    ]);

    let mut deleted = Vec::new();
    executor
        .run_delete(articles(3), ResourcePipeline::DeleteBulk, |tree| {
            deleted = root_ids(tree);
            Ok(())
        })
        .unwrap();

    assert_eq!(deleted, ["1", "3"]);
    let after = recorder.calls_of("articles", ResourceHook::AfterDelete);
    assert_eq!(after[0].ids, ids(&["1", "3"]));
    assert_eq!(after[0].detail, ["succeeded=true"]);
}

#[test]
fn after_delete_reports_a_failed_delete() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[ResourceHook::AfterDelete]),
    ]);

    let err = executor
        .run_delete(articles(1), ResourcePipeline::Delete, |_| {
            Err(HookError::user("database unavailable"))
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "database unavailable");
    let after = recorder.calls_of("articles", ResourceHook::AfterDelete);
    assert_eq!(after[0].detail, ["succeeded=false"]);
}

#[test]
fn before_delete_prefers_persisted_values() {
    let store = Arc::new(MemoryStore::new());
    store.insert(Resource::new("articles", "1").with_attribute("title", "stored"));
    let recorder = Recorder::new();
    let executor = executor_with_store(
        vec![
            TestDefinition::new("articles", &recorder).with_capabilities(
                HookCapabilities::none()
                    .with(ResourceHook::BeforeDelete)
                    .load_database_values(ResourceHook::BeforeDelete, true),
            ),
        ],
        store,
    );
    let mut tree = ResourceTree::from_roots([Resource::new("articles", "1")]);

    executor.before_delete(&mut tree, ResourcePipeline::Delete).unwrap();

    let article = tree.root_resources().next().unwrap();
    assert_eq!(article.attribute("title"), Some(&serde_json::json!("stored")));
}

// ═══════════════════════════════════════════════════════════════════════════════
// RETURN
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn on_return_only_touches_types_that_implement_it() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("tags", &recorder)
            .implementing(&[ResourceHook::OnReturn])
            .rejecting(&["a"])
            .stamping("label", "visible"),
    ]);
    let mut tree = article_with_author_and_tags();
    let article = key("articles", "1");
    let person = key("people", "9");
    let article_before = tree.get(&article).cloned();
    let person_before = tree.get(&person).cloned();

    executor.on_return(&mut tree, ResourcePipeline::Get).unwrap();

    assert_eq!(recorder.labels(), ["tags:OnReturn"]);
    assert_eq!(recorder.calls()[0].ids, ids(&["a", "b"]));
    assert_eq!(slot_ids(&tree, &article, "tags"), ["b"]);
    assert!(tree.get(&key("tags", "a")).is_none());
    assert_eq!(
        tree.get(&key("tags", "b")).and_then(|tag| tag.attribute("label")),
        Some(&serde_json::json!("visible"))
    );
    assert_eq!(tree.get(&article).cloned(), article_before);
    assert_eq!(tree.get(&person).cloned(), person_before);
    assert_eq!(slot_ids(&tree, &article, "author"), ["9"]);
}

#[test]
fn resource_hidden_on_return_is_not_returned_through_a_deeper_path() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("people", &recorder)
            .implementing(&[ResourceHook::OnReturn])
            .rejecting(&["8"]),
    ]);
    let mut tree = shared_author();

    executor.on_return(&mut tree, ResourcePipeline::Get).unwrap();

    assert_eq!(
        tree.relationship(&key("articles", "1"), "author"),
        Some(&RelationshipValue::ToOne(None))
    );
    assert_eq!(slot_ids(&tree, &key("articles", "2"), "author"), ["9"]);
    assert!(slot_ids(&tree, &key("people", "9"), "friends").is_empty());
    assert!(tree.get(&key("people", "8")).is_none());

    let calls = recorder.calls_of("people", ResourceHook::OnReturn);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ids, ids(&["8", "9"]));
}

#[test]
fn single_resource_requests_reject_multiple_returned_roots() {
    let recorder = Recorder::new();
    let executor = executor(vec![
        TestDefinition::new("articles", &recorder).implementing(&[ResourceHook::OnReturn]),
    ]);
    let mut tree = articles(2);

    let err = executor
        .on_return(&mut tree, ResourcePipeline::GetSingle)
        .unwrap_err();

    assert!(matches!(
        err,
        HookError::InvalidHookResponse {
            hook: ResourceHook::OnReturn,
            ..
        }
    ));
    executor.on_return(&mut tree, ResourcePipeline::Get).unwrap();
}

#[test]
fn executor_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ResourceHookExecutor>();
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

mod prop_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// The root set after a before-hook is exactly what the hook returned.
        #[test]
        fn roots_equal_the_returned_set(
            count in 1usize..8,
            rejected in proptest::collection::vec(1usize..8, 0..4),
            reverse in any::<bool>(),
        ) {
            let rejected: Vec<String> = rejected.iter().map(ToString::to_string).collect();
            let rejected_refs: Vec<&str> = rejected.iter().map(String::as_str).collect();
            let recorder = Recorder::new();
            let mut definition = TestDefinition::new("articles", &recorder)
                .implementing(&[ResourceHook::BeforeCreate])
                .rejecting(&rejected_refs);
            if reverse {
                definition = definition.reversing();
            }
            let executor = executor(vec![definition]);
            let mut tree = articles(count);

            executor.before_create(&mut tree, ResourcePipeline::PostBulk).unwrap();

            let mut expected: Vec<String> = (1..=count)
                .map(|id| id.to_string())
                .filter(|id| !rejected.contains(id))
                .collect();
            if reverse {
                expected.reverse();
            }
            prop_assert_eq!(root_ids(&tree), expected);
        }
    }
}

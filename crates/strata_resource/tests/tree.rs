//! Resource tree properties over arbitrary relationship data.

use proptest::collection::vec;
use proptest::prelude::*;
use strata_resource::{RelationshipValue, Resource, ResourceKey, ResourceTree};

fn node(index: usize) -> ResourceKey {
    ResourceKey::new("nodes", index.to_string())
}

/// `count` nodes, `links` as to-many `next` slots, rooted at `roots`.
fn linked_tree(count: usize, roots: &[usize], links: &[(usize, usize)]) -> ResourceTree {
    let mut tree = ResourceTree::new();
    for index in 0..count {
        tree.insert(Resource::from_key(node(index)));
    }
    for &root in roots {
        tree.push_root(Resource::from_key(node(root)));
    }
    let mut targets: Vec<Vec<ResourceKey>> = vec![Vec::new(); count];
    for &(from, to) in links {
        targets[from].push(node(to));
    }
    for (index, keys) in targets.into_iter().enumerate() {
        if !keys.is_empty() {
            tree.set_relationship(&node(index), "next", RelationshipValue::ToMany(keys));
        }
    }
    tree
}

fn linked() -> impl Strategy<Value = (usize, Vec<usize>, Vec<(usize, usize)>)> {
    (1usize..12).prop_flat_map(|count| {
        (
            Just(count),
            vec(0..count, 1..4),
            vec((0..count, 0..count), 0..24),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn edges_list_every_reference((count, roots, links) in linked()) {
        let tree = linked_tree(count, &roots, &links);
        prop_assert_eq!(tree.edges().count(), links.len());
    }

    #[test]
    fn pruning_keeps_exactly_the_reachable_resources((count, roots, links) in linked()) {
        let mut tree = linked_tree(count, &roots, &links);
        let reachable = tree.reachable();

        let removed = tree.prune_unreachable();

        prop_assert_eq!(removed, count - reachable.len());
        prop_assert!(tree.resources().all(|resource| reachable.contains(resource.key())));
        prop_assert!(tree.edges().all(|edge| reachable.contains(edge.source)));
        prop_assert_eq!(tree.prune_unreachable(), 0);
    }

    #[test]
    fn replacing_roots_keeps_order_and_slots(
        (count, roots, links) in linked(),
        replacement in vec(0usize..12, 0..6),
    ) {
        let mut tree = linked_tree(count, &roots, &links);
        let before: Vec<(ResourceKey, Option<RelationshipValue>)> = (0..count)
            .map(|index| (node(index), tree.relationship(&node(index), "next").cloned()))
            .collect();
        let replacement: Vec<usize> = replacement.into_iter().filter(|index| *index < count).collect();

        tree.replace_roots(
            replacement
                .iter()
                .map(|index| Resource::from_key(node(*index)).with_attribute("replaced", true)),
        );

        let mut expected: Vec<ResourceKey> = Vec::new();
        for index in &replacement {
            if !expected.contains(&node(*index)) {
                expected.push(node(*index));
            }
        }
        prop_assert_eq!(tree.roots(), expected.as_slice());
        for (key, slot) in before {
            prop_assert_eq!(tree.relationship(&key, "next").cloned(), slot);
        }
        prop_assert!(tree.root_resources().all(|root| root.attribute("replaced").is_some()));
    }
}

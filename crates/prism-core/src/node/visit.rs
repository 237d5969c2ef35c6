//! Hierarchy walks over a [`NodeStore`].
//!
//! Visitors receive the id and node of every live node reached. Stale ids
//! encountered along the way are skipped.

use super::{Node, NodeId, NodeStore};

/// Visits the subtree under `id` post-order: children first, then the node.
pub fn depth_first(store: &NodeStore, id: NodeId, visit: &mut impl FnMut(NodeId, &Node)) {
    let Some(node) = store.get(id) else {
        return;
    };
    for child in node.children() {
        depth_first(store, *child, visit);
    }
    visit(id, node);
}

/// Visits `id`, then each ancestor up to the root.
pub fn root_last(store: &NodeStore, id: NodeId, visit: &mut impl FnMut(NodeId, &Node)) {
    let mut current = Some(id);
    while let Some(id) = current {
        let Some(node) = store.get(id) else {
            return;
        };
        visit(id, node);
        current = node.parent();
    }
}

/// Visits the root ancestor first and `id` last.
pub fn root_first(store: &NodeStore, id: NodeId, visit: &mut impl FnMut(NodeId, &Node)) {
    let mut chain = Vec::new();
    root_last(store, id, &mut |id, _| chain.push(id));
    for id in chain.into_iter().rev() {
        if let Some(node) = store.get(id) {
            visit(id, node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (NodeStore, [NodeId; 4]) {
        let mut store = NodeStore::new();
        let root = store.create_named("root");
        let a = store.create_named("a");
        let b = store.create_named("b");
        let leaf = store.create_named("leaf");
        store.add_child(root, a).unwrap();
        store.add_child(root, b).unwrap();
        store.add_child(a, leaf).unwrap();
        (store, [root, a, b, leaf])
    }

    fn collect(
        store: &NodeStore,
        id: NodeId,
        walk: fn(&NodeStore, NodeId, &mut dyn FnMut(NodeId, &Node)),
    ) -> Vec<String> {
        let mut out = Vec::new();
        walk(store, id, &mut |_, node| out.push(node.name().to_owned()));
        out
    }

    #[test]
    fn test_depth_first_visits_children_before_parent() {
        let (store, [root, ..]) = chain();
        let visited = collect(&store, root, |s, id, f| depth_first(s, id, &mut |i, n| f(i, n)));
        assert_eq!(visited, ["leaf", "a", "b", "root"]);
    }

    #[test]
    fn test_root_last_walks_up() {
        let (store, [.., leaf]) = chain();
        let visited = collect(&store, leaf, |s, id, f| root_last(s, id, &mut |i, n| f(i, n)));
        assert_eq!(visited, ["leaf", "a", "root"]);
    }

    #[test]
    fn test_root_first_walks_down() {
        let (store, [.., leaf]) = chain();
        let visited = collect(&store, leaf, |s, id, f| root_first(s, id, &mut |i, n| f(i, n)));
        assert_eq!(visited, ["root", "a", "leaf"]);
    }

    #[test]
    fn test_stale_id_visits_nothing() {
        let (mut store, [_, a, ..]) = chain();
        store.dispose(a).unwrap();
        let mut count = 0;
        depth_first(&store, a, &mut |_, _| count += 1);
        root_first(&store, a, &mut |_, _| count += 1);
        assert_eq!(count, 0);
    }
}

//! Граф traversal helpers over the ownership tree

use std::collections::HashSet;

use super::node::NodeId;

/// Preorder DFS from `start` nodes; children are visited in the order
/// `get_children` returns them.
pub fn dfs<F>(start: &[NodeId], mut get_children: F) -> Vec<NodeId>
where
    F: FnMut(NodeId) -> Vec<NodeId>,
{
    let mut visited = HashSet::new();
    let mut stack: Vec<NodeId> = start.iter().rev().copied().collect();
    let mut result = Vec::new();

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }

        result.push(node);

        // Детей кладём в обратном порядке, чтобы первый ребёнок вышел первым
        for child in get_children(node).into_iter().rev() {
            if !visited.contains(&child) {
                stack.push(child);
            }
        }
    }

    result
}

/// Chain of parents from `start` (exclusive) up to the top
pub fn ancestors<F>(start: NodeId, mut parent_of: F) -> Vec<NodeId>
where
    F: FnMut(NodeId) -> Option<NodeId>,
{
    let mut result = Vec::new();
    let mut seen = HashSet::new();
    let mut current = start;
    seen.insert(start);
    while let Some(p) = parent_of(current) {
        if !seen.insert(p) {
            break;
        }
        result.push(p);
        current = p;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tree() -> HashMap<NodeId, Vec<NodeId>> {
        let mut g = HashMap::new();
        g.insert(1, vec![2, 5]);
        g.insert(2, vec![3, 4]);
        g.insert(5, vec![6]);
        g
    }

    #[test]
    fn test_dfs_preorder() {
        let g = tree();
        let order = dfs(&[1], |n| g.get(&n).cloned().unwrap_or_default());
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_dfs_cycle_terminates() {
        let mut g = HashMap::new();
        g.insert(1, vec![2]);
        g.insert(2, vec![1]);
        let order = dfs(&[1], |n| g.get(&n).cloned().unwrap_or_default());
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_ancestors() {
        let parents: HashMap<NodeId, NodeId> = [(4, 2), (2, 1)].into_iter().collect();
        assert_eq!(ancestors(4, |n| parents.get(&n).copied()), vec![2, 1]);
        assert!(ancestors(1, |n| parents.get(&n).copied()).is_empty());
    }
}

//! Derives the category forest from flat records.
//!
//! Categories only point at their children, so parents are found by
//! inverting `child_categories`. An id index built once per resolution keeps
//! the whole pass linear in the number of edges.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use uuid::Uuid;

use crate::features::categories::models::{unique_ids, Category};

/// A category placed in the forest
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryNode {
    pub category: Category,
    pub level: usize,
    pub has_children: bool,
    pub children: Vec<CategoryNode>,
}

/// Depth-first row of a flattened forest
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode {
    pub category: Category,
    pub level: usize,
    pub has_children: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum HierarchyError {
    #[error("Child category {0} does not exist in this catalog")]
    UnknownChild(Uuid),

    #[error("Category {0} cannot list itself as a child")]
    SelfReference(Uuid),

    #[error("Adding child {child} under {parent} would create a cycle")]
    Cycle { parent: Uuid, child: Uuid },
}

struct CategoryIndex<'a> {
    by_id: HashMap<Uuid, &'a Category>,
    listed_as_child: HashSet<Uuid>,
}

impl<'a> CategoryIndex<'a> {
    fn build(categories: &'a [Category]) -> Self {
        let by_id = categories.iter().map(|c| (c.id, c)).collect();
        let listed_as_child = categories
            .iter()
            .flat_map(|parent| {
                parent
                    .child_categories
                    .iter()
                    .copied()
                    .filter(move |child| *child != parent.id)
            })
            .collect();
        Self {
            by_id,
            listed_as_child,
        }
    }

    fn is_root(&self, id: Uuid) -> bool {
        !self.listed_as_child.contains(&id)
    }

    /// Resolved children in sibling order; dangling ids are skipped
    fn children_of(&self, category: &Category) -> Vec<&'a Category> {
        let mut children: Vec<&Category> = unique_ids(category.child_categories.iter().copied())
            .into_iter()
            .filter_map(|id| self.by_id.get(&id).copied())
            .collect();
        children.sort_by_key(|c| c.order);
        children
    }
}

/// Build the forest: roots in `order`, each subtree depth-first
///
/// Categories stuck in a cycle that no root reaches are placed as extra
/// roots after the regular ones, so every record appears at least once.
pub fn resolve_tree(categories: &[Category]) -> Vec<CategoryNode> {
    let index = CategoryIndex::build(categories);

    let mut roots: Vec<&Category> = categories.iter().filter(|c| index.is_root(c.id)).collect();
    roots.sort_by_key(|c| c.order);

    let mut path = HashSet::new();
    let mut visited = HashSet::new();
    let mut forest: Vec<CategoryNode> = roots
        .into_iter()
        .map(|root| build_node(root, 0, &index, &mut path, &mut visited))
        .collect();

    let mut stranded: Vec<&Category> = categories
        .iter()
        .filter(|c| !visited.contains(&c.id))
        .collect();
    stranded.sort_by_key(|c| c.order);

    for category in stranded {
        if visited.contains(&category.id) {
            continue;
        }
        tracing::warn!(
            "Category {} is only reachable through a cycle; listed as a root",
            category.id
        );
        forest.push(build_node(category, 0, &index, &mut path, &mut visited));
    }

    forest
}

fn build_node(
    category: &Category,
    level: usize,
    index: &CategoryIndex<'_>,
    path: &mut HashSet<Uuid>,
    visited: &mut HashSet<Uuid>,
) -> CategoryNode {
    path.insert(category.id);
    visited.insert(category.id);

    let mut children = Vec::new();
    for child in index.children_of(category) {
        // Legacy data may still hold cycles; cut at the repeated node
        if path.contains(&child.id) {
            tracing::warn!(
                "Category cycle detected: {} -> {}; subtree truncated",
                category.id,
                child.id
            );
            continue;
        }
        children.push(build_node(child, level + 1, index, path, visited));
    }

    path.remove(&category.id);

    CategoryNode {
        category: category.clone(),
        level,
        has_children: !children.is_empty(),
        children,
    }
}

/// Depth-first listing of a forest, parents before their children
pub fn flatten(nodes: &[CategoryNode]) -> Vec<FlatNode> {
    let mut rows = Vec::new();
    for node in nodes {
        push_flat(node, &mut rows);
    }
    rows
}

fn push_flat(node: &CategoryNode, rows: &mut Vec<FlatNode>) {
    rows.push(FlatNode {
        category: node.category.clone(),
        level: node.level,
        has_children: node.has_children,
    });
    for child in &node.children {
        push_flat(child, rows);
    }
}

/// Drop inactive categories together with everything below them
pub fn prune_inactive(nodes: Vec<CategoryNode>) -> Vec<CategoryNode> {
    nodes
        .into_iter()
        .filter(|node| node.category.is_active)
        .map(|mut node| {
            node.children = prune_inactive(node.children);
            node.has_children = !node.children.is_empty();
            node
        })
        .collect()
}

/// Flat table listing: roots first, then categories that are someone's child
///
/// Within each group the `order` field decides; ties keep list order.
pub fn table_order(categories: &[Category]) -> Vec<Category> {
    let index = CategoryIndex::build(categories);
    let mut rows: Vec<Category> = categories.to_vec();
    rows.sort_by_key(|c| (!index.is_root(c.id), c.order));
    rows
}

/// `table_order` rows tagged with their tier: roots at level 0, children at 1
pub fn table_rows(categories: &[Category]) -> Vec<FlatNode> {
    let index = CategoryIndex::build(categories);
    table_order(categories)
        .into_iter()
        .map(|category| FlatNode {
            level: usize::from(!index.is_root(category.id)),
            has_children: !index.children_of(&category).is_empty(),
            category,
        })
        .collect()
}

/// Check a proposed `child_categories` list for `parent`
///
/// `parent` is `None` for a category that is being created and therefore
/// cannot be reached from anything yet. Returns the de-duplicated list.
pub fn validate_children(
    categories: &[Category],
    parent: Option<Uuid>,
    children: &[Uuid],
) -> Result<Vec<Uuid>, HierarchyError> {
    let index = CategoryIndex::build(categories);
    let children = unique_ids(children.iter().copied());

    for child in &children {
        if Some(*child) == parent {
            return Err(HierarchyError::SelfReference(*child));
        }
        if !index.by_id.contains_key(child) {
            return Err(HierarchyError::UnknownChild(*child));
        }
        if let Some(parent) = parent {
            if reaches(&index, *child, parent) {
                return Err(HierarchyError::Cycle {
                    parent,
                    child: *child,
                });
            }
        }
    }

    Ok(children)
}

/// Is `target` reachable from `from` by following child pointers?
fn reaches(index: &CategoryIndex<'_>, from: Uuid, target: Uuid) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();

    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if !seen.insert(id) {
            continue;
        }
        if let Some(category) = index.by_id.get(&id) {
            stack.extend(category.child_categories.iter().copied());
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(name: &str, order: i64) -> Category {
        let now = Utc::now();
        Category {
            id: Uuid::now_v7(),
            name: name.to_string(),
            icon: None,
            color: "#3B82F6".to_string(),
            is_active: true,
            courier_compatible: Some(true),
            order,
            child_categories: vec![],
            product_categories: Some(vec![]),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_single_category_is_root_without_children() {
        let elektronik = category("Elektronik", 0);
        let tree = resolve_tree(std::slice::from_ref(&elektronik));

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.id, elektronik.id);
        assert_eq!(tree[0].level, 0);
        assert!(!tree[0].has_children);
    }

    #[test]
    fn test_child_is_nested_one_level_down() {
        let mut a = category("A", 0);
        let b = category("B", 1);
        a.child_categories = vec![b.id];

        let tree = resolve_tree(&[a.clone(), b.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.id, a.id);
        assert!(tree[0].has_children);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].category.id, b.id);
        assert_eq!(tree[0].children[0].level, 1);
    }

    #[test]
    fn test_root_iff_not_listed_by_another() {
        let mut a = category("A", 0);
        let b = category("B", 1);
        let mut c = category("C", 2);
        a.child_categories = vec![b.id];
        // listing itself does not make a category a non-root
        c.child_categories = vec![c.id];
        let all = vec![a.clone(), b.clone(), c.clone()];

        let roots: HashSet<Uuid> = resolve_tree(&all).iter().map(|n| n.category.id).collect();
        for cat in &all {
            let listed = all
                .iter()
                .any(|d| d.id != cat.id && d.child_categories.contains(&cat.id));
            assert_eq!(roots.contains(&cat.id), !listed);
        }
    }

    #[test]
    fn test_siblings_sorted_by_order_and_dangling_skipped() {
        let mut parent = category("P", 0);
        let late = category("late", 9);
        let early = category("early", 2);
        parent.child_categories = vec![late.id, Uuid::now_v7(), early.id];

        let tree = resolve_tree(&[parent, late.clone(), early.clone()]);
        let names: Vec<&str> = tree[0]
            .children
            .iter()
            .map(|n| n.category.name.as_str())
            .collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut a = category("A", 1);
        let mut b = category("B", 0);
        let c = category("C", 2);
        a.child_categories = vec![c.id];
        b.child_categories = vec![];
        let all = vec![a, b, c];

        assert_eq!(resolve_tree(&all), resolve_tree(&all));
    }

    #[test]
    fn test_legacy_cycle_is_cut() {
        let mut root = category("root", 0);
        let mut x = category("x", 1);
        let mut y = category("y", 2);
        root.child_categories = vec![x.id];
        x.child_categories = vec![y.id];
        y.child_categories = vec![x.id];

        let tree = resolve_tree(&[root, x, y]);
        let rows = flatten(&tree);
        let levels: Vec<usize> = rows.iter().map(|r| r.level).collect();
        assert_eq!(levels, vec![0, 1, 2]);
        assert!(!rows[2].has_children);
    }

    #[test]
    fn test_rootless_cycle_still_renders() {
        let mut x = category("x", 0);
        let mut y = category("y", 1);
        x.child_categories = vec![y.id];
        y.child_categories = vec![x.id];

        let tree = resolve_tree(&[y.clone(), x.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.id, x.id);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].category.id, y.id);
        assert!(!tree[0].children[0].has_children);

        let ids: HashSet<Uuid> = flatten(&tree).iter().map(|r| r.category.id).collect();
        assert_eq!(ids, HashSet::from([x.id, y.id]));
    }

    #[test]
    fn test_table_order_puts_roots_first() {
        let mut parent = category("parent", 5);
        let child = category("child", 0);
        let other = category("other", 1);
        parent.child_categories = vec![child.id];

        let names: Vec<String> = table_order(&[child, parent, other])
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["other", "parent", "child"]);
    }

    #[test]
    fn test_table_rows_tag_tiers() {
        let mut parent = category("parent", 0);
        let child = category("child", 1);
        parent.child_categories = vec![child.id];

        let rows = table_rows(&[child, parent]);
        let tiers: Vec<(&str, usize, bool)> = rows
            .iter()
            .map(|r| (r.category.name.as_str(), r.level, r.has_children))
            .collect();
        assert_eq!(tiers, vec![("parent", 0, true), ("child", 1, false)]);
    }

    #[test]
    fn test_prune_inactive_removes_subtree() {
        let mut a = category("A", 0);
        let mut b = category("B", 1);
        let c = category("C", 2);
        a.child_categories = vec![b.id];
        b.child_categories = vec![c.id];
        b.is_active = false;

        let pruned = prune_inactive(resolve_tree(&[a, b, c]));
        assert_eq!(pruned.len(), 1);
        assert!(!pruned[0].has_children);
    }

    #[test]
    fn test_validate_children_rejects_cycles() {
        let mut a = category("A", 0);
        let mut b = category("B", 1);
        let c = category("C", 2);
        a.child_categories = vec![b.id];
        b.child_categories = vec![c.id];
        let all = vec![a.clone(), b.clone(), c.clone()];

        assert_eq!(
            validate_children(&all, Some(c.id), &[a.id]),
            Err(HierarchyError::Cycle {
                parent: c.id,
                child: a.id
            })
        );
        assert_eq!(
            validate_children(&all, Some(a.id), &[a.id]),
            Err(HierarchyError::SelfReference(a.id))
        );
        let ghost = Uuid::now_v7();
        assert_eq!(
            validate_children(&all, None, &[ghost]),
            Err(HierarchyError::UnknownChild(ghost))
        );
        assert_eq!(
            validate_children(&all, Some(a.id), &[c.id, b.id, c.id]),
            Ok(vec![c.id, b.id])
        );
    }
}

//! Hierarchy Builder
//!
//! 把扁平的 item 列表 (已按排序值排好) 组装成森林，纯函数，无副作用。
//! 渲染和拍平是独立的只读遍历。

use serde::Serialize;
use shared::models::{Item, ItemId, ROOT_PARENT};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

/// A node of the forest: one item and its children, in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub item: Item,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree (self included)
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

/// Build a forest from a flat, already sorted sequence of items
///
/// - `parent_id == 0`, an unknown parent or a self-reference makes a root
/// - children keep the relative order in which they were supplied
/// - items caught in a multi-item parent cycle are appended as roots, each
///   item appears exactly once
pub fn build_forest(items: &[Item]) -> Vec<TreeNode> {
    let known: HashSet<ItemId> = items.iter().map(|i| i.id).collect();

    let mut roots = Vec::new();
    let mut children: HashMap<ItemId, Vec<usize>> = HashMap::new();
    for (index, item) in items.iter().enumerate() {
        let parent = item.parent_id;
        if parent == ROOT_PARENT || parent == item.id || !known.contains(&parent) {
            roots.push(index);
        } else {
            children.entry(parent).or_default().push(index);
        }
    }

    let mut placed = HashSet::with_capacity(items.len());
    let mut forest: Vec<TreeNode> = roots
        .into_iter()
        .filter_map(|index| attach(index, items, &children, &mut placed))
        .collect();

    for index in 0..items.len() {
        if let Some(node) = attach(index, items, &children, &mut placed) {
            forest.push(node);
        }
    }

    forest
}

fn attach(
    index: usize,
    items: &[Item],
    children: &HashMap<ItemId, Vec<usize>>,
    placed: &mut HashSet<ItemId>,
) -> Option<TreeNode> {
    let item = &items[index];
    if !placed.insert(item.id) {
        return None;
    }

    let kids = children
        .get(&item.id)
        .map(|indices| {
            indices
                .iter()
                .filter_map(|&child| attach(child, items, children, placed))
                .collect()
        })
        .unwrap_or_default();

    Some(TreeNode {
        item: item.clone(),
        children: kids,
    })
}

/// Depth-first `(id, parent_id)` sequence, the shape a drag-and-drop
/// manager submits
///
/// Parent ids are taken from the tree structure, so roots always get `0`.
pub fn flatten(forest: &[TreeNode]) -> Vec<(ItemId, ItemId)> {
    fn walk(nodes: &[TreeNode], parent: ItemId, out: &mut Vec<(ItemId, ItemId)>) {
        for node in nodes {
            out.push((node.item.id, parent));
            walk(&node.children, node.item.id, out);
        }
    }

    let mut out = Vec::new();
    walk(forest, ROOT_PARENT, &mut out);
    out
}

/// Indented text outline of a forest
///
/// ```text
/// - Home (#1)
///   - About (#2)
/// ```
pub fn render_outline(forest: &[TreeNode]) -> String {
    fn walk(nodes: &[TreeNode], depth: usize, out: &mut String) {
        for node in nodes {
            let _ = writeln!(
                out,
                "{:indent$}- {} (#{})",
                "",
                node.item.title,
                node.item.id,
                indent = depth * 2
            );
            walk(&node.children, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(forest, 0, &mut out);
    out
}

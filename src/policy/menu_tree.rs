//! Menu hierarchy: reparent validation and in-memory tree assembly.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MenuTreeError {
    #[error("Menu {0} cannot be its own parent")]
    SelfParent(i32),

    #[error("Moving menu {menu} under {parent} would create a cycle")]
    Cycle { menu: i32, parent: i32 },

    #[error("Parent menu {0} does not exist")]
    UnknownParent(i32),
}

impl From<MenuTreeError> for ApiError {
    fn from(err: MenuTreeError) -> Self {
        match err {
            MenuTreeError::SelfParent(_) => ApiError::bad_request("Un menú no puede ser su propio padre"),
            MenuTreeError::Cycle { .. } => {
                ApiError::bad_request("El menú padre seleccionado generaría una referencia circular")
            }
            MenuTreeError::UnknownParent(_) => ApiError::bad_request("El menú padre no existe"),
        }
    }
}

/// `0` and NULL both mark a root.
pub fn normalize_parent(parent: Option<i32>) -> Option<i32> {
    parent.filter(|p| *p != 0)
}

/// Validate moving `menu` under `new_parent`, given every menu's current parent.
///
/// Walks the ancestors of the proposed parent; the move is rejected when `menu`
/// shows up among them. Loops already present in the data stop the walk.
pub fn check_reparent(
    parents: &HashMap<i32, Option<i32>>,
    menu: i32,
    new_parent: Option<i32>,
) -> Result<(), MenuTreeError> {
    let Some(parent) = normalize_parent(new_parent) else {
        return Ok(());
    };
    if parent == menu {
        return Err(MenuTreeError::SelfParent(menu));
    }
    if !parents.contains_key(&parent) {
        return Err(MenuTreeError::UnknownParent(parent));
    }

    let mut seen = HashSet::new();
    let mut current = Some(parent);
    while let Some(id) = current {
        if id == menu {
            return Err(MenuTreeError::Cycle { menu, parent });
        }
        if !seen.insert(id) {
            break;
        }
        current = parents.get(&id).copied().flatten().filter(|p| *p != 0);
    }
    Ok(())
}

/// Row that can be placed in a menu tree.
pub trait TreeItem {
    fn id(&self) -> i32;
    fn parent(&self) -> Option<i32>;
    fn order(&self) -> i32;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MenuNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<MenuNode<T>>,
}

/// Group a flat list of rows by parent and nest them starting at the roots.
/// Siblings are ordered by `orden`, then id. Rows whose parent is not in the list
/// are dropped.
pub fn build_tree<T: TreeItem>(rows: Vec<T>) -> Vec<MenuNode<T>> {
    let mut by_parent: HashMap<Option<i32>, Vec<T>> = HashMap::new();
    for row in rows {
        by_parent.entry(normalize_parent(row.parent())).or_default().push(row);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|r| (r.order(), r.id()));
    }

    let mut placed = HashSet::new();
    attach(None, &mut by_parent, &mut placed)
}

fn attach<T: TreeItem>(
    parent: Option<i32>,
    by_parent: &mut HashMap<Option<i32>, Vec<T>>,
    placed: &mut HashSet<i32>,
) -> Vec<MenuNode<T>> {
    let Some(children) = by_parent.remove(&parent) else {
        return Vec::new();
    };

    let mut nodes = Vec::with_capacity(children.len());
    for item in children {
        if !placed.insert(item.id()) {
            continue;
        }
        let children = attach(Some(item.id()), by_parent, placed);
        nodes.push(MenuNode { item, children });
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Item {
        id: i32,
        parent: Option<i32>,
        orden: i32,
    }

    impl TreeItem for Item {
        fn id(&self) -> i32 {
            self.id
        }
        fn parent(&self) -> Option<i32> {
            self.parent
        }
        fn order(&self) -> i32 {
            self.orden
        }
    }

    fn item(id: i32, parent: Option<i32>, orden: i32) -> Item {
        Item { id, parent, orden }
    }

    #[test]
    fn rejects_moving_parent_under_child() {
        let parents = HashMap::from([(2, None), (5, Some(2))]);
        let before = parents.clone();
        assert_eq!(
            check_reparent(&parents, 2, Some(5)),
            Err(MenuTreeError::Cycle { menu: 2, parent: 5 })
        );
        assert_eq!(parents, before);
    }

    #[test]
    fn rejects_descendants_at_any_depth() {
        // chain 1 <- 2 <- ... <- 50
        let mut parents = HashMap::from([(1, None)]);
        for id in 2..=50 {
            parents.insert(id, Some(id - 1));
        }
        for target in 1..50 {
            for descendant in (target + 1)..=50 {
                assert!(check_reparent(&parents, target, Some(descendant)).is_err());
            }
        }
        assert!(check_reparent(&parents, 50, Some(1)).is_ok());
    }

    #[test]
    fn self_parent_and_unknown_parent() {
        let parents = HashMap::from([(1, None), (2, Some(1))]);
        assert_eq!(check_reparent(&parents, 2, Some(2)), Err(MenuTreeError::SelfParent(2)));
        assert_eq!(check_reparent(&parents, 2, Some(9)), Err(MenuTreeError::UnknownParent(9)));
        assert!(check_reparent(&parents, 2, Some(0)).is_ok());
        assert!(check_reparent(&parents, 2, None).is_ok());
    }

    #[test]
    fn existing_loop_does_not_hang() {
        let parents = HashMap::from([(1, Some(2)), (2, Some(1)), (3, None)]);
        assert!(check_reparent(&parents, 3, Some(1)).is_ok());
    }

    #[test]
    fn builds_nested_tree_in_order() {
        let rows = vec![
            item(4, Some(1), 2),
            item(1, None, 1),
            item(3, Some(1), 1),
            item(2, Some(0), 0),
            item(5, Some(3), 0),
            item(9, Some(42), 0),
        ];
        let tree = build_tree(rows);

        let roots: Vec<i32> = tree.iter().map(|n| n.item.id).collect();
        assert_eq!(roots, vec![2, 1]);
        let children: Vec<i32> = tree[1].children.iter().map(|n| n.item.id).collect();
        assert_eq!(children, vec![3, 4]);
        assert_eq!(tree[1].children[0].children[0].item.id, 5);
    }

    #[test]
    fn node_serializes_flat_with_children() {
        let tree = build_tree(vec![item(1, None, 0)]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json, serde_json::json!([{ "id": 1, "parent": null, "orden": 0, "children": [] }]));
    }
}

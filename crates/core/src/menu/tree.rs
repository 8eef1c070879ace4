//! Local mirror of a device's menu structure

use std::collections::HashMap;

use super::item::{MenuItem, MenuItemBuilder};
use super::state::{MenuState, MenuValue};
use crate::error::TreeError;

/// Id of the implicit root submenu
pub const ROOT_ID: u16 = 0;

/// What [`MenuTree::add_item`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Id existed, definition replaced in place
    Replaced,
}

/// Menu tree with item states
///
/// Children keep their arrival order. Every item except the root has exactly
/// one parent and only submenus have children.
#[derive(Debug, Clone)]
pub struct MenuTree {
    items: HashMap<u16, MenuItem>,
    children: HashMap<u16, Vec<u16>>,
    parents: HashMap<u16, u16>,
    states: HashMap<u16, MenuState>,
}

impl Default for MenuTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuTree {
    pub fn new() -> Self {
        let root = MenuItemBuilder::sub_menu(ROOT_ID, "ROOT").build();
        let mut items = HashMap::new();
        items.insert(ROOT_ID, root);
        let mut children = HashMap::new();
        children.insert(ROOT_ID, Vec::new());
        Self {
            items,
            children,
            parents: HashMap::new(),
            states: HashMap::new(),
        }
    }

    pub fn root(&self) -> &MenuItem {
        &self.items[&ROOT_ID]
    }

    /// Add an item under `parent_id`, replacing an existing definition with the same id
    pub fn add_item(&mut self, parent_id: u16, item: MenuItem) -> Result<AddOutcome, TreeError> {
        if item.id == ROOT_ID {
            return Err(TreeError::ReservedId { id: ROOT_ID });
        }
        let parent = self
            .items
            .get(&parent_id)
            .ok_or(TreeError::ItemNotFound { id: parent_id })?;
        if !parent.is_sub_menu() {
            return Err(TreeError::NotASubMenu { id: parent_id });
        }

        let id = item.id;
        if let Some(existing) = self.parents.get(&id).copied() {
            if existing != parent_id {
                return Err(TreeError::ParentMismatch {
                    id,
                    existing,
                    requested: parent_id,
                });
            }
            let has_children = self.children.get(&id).is_some_and(|c| !c.is_empty());
            if has_children && !item.is_sub_menu() {
                return Err(TreeError::NotASubMenu { id });
            }
            if item.is_sub_menu() {
                self.children.entry(id).or_default();
            } else {
                self.children.remove(&id);
            }
            self.items.insert(id, item);
            return Ok(AddOutcome::Replaced);
        }

        if item.is_sub_menu() {
            self.children.insert(id, Vec::new());
        }
        self.items.insert(id, item);
        self.parents.insert(id, parent_id);
        self.children.entry(parent_id).or_default().push(id);
        Ok(AddOutcome::Added)
    }

    /// Remove an item; submenus take their descendants with them
    pub fn remove_item(&mut self, id: u16) -> Option<MenuItem> {
        if id == ROOT_ID {
            return None;
        }
        let parent = self.parents.remove(&id)?;
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|child| *child != id);
        }
        self.drop_subtree(id)
    }

    fn drop_subtree(&mut self, id: u16) -> Option<MenuItem> {
        for child in self.children.remove(&id).unwrap_or_default() {
            self.parents.remove(&child);
            self.drop_subtree(child);
        }
        self.states.remove(&id);
        self.items.remove(&id)
    }

    pub fn get_menu_by_id(&self, id: u16) -> Option<&MenuItem> {
        self.items.get(&id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.items.contains_key(&id)
    }

    /// Children of a submenu in arrival order, empty for unknown ids
    pub fn children(&self, parent_id: u16) -> Vec<&MenuItem> {
        self.children
            .get(&parent_id)
            .map(|ids| ids.iter().filter_map(|id| self.items.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, id: u16) -> Option<&MenuItem> {
        self.parents.get(&id).and_then(|p| self.items.get(p))
    }

    /// Store a new state for an item, returns false for unknown ids
    pub fn change_state(&mut self, id: u16, state: MenuState) -> bool {
        if id == ROOT_ID || !self.items.contains_key(&id) {
            return false;
        }
        self.states.insert(id, state);
        true
    }

    pub fn get_state(&self, id: u16) -> Option<&MenuState> {
        self.states.get(&id)
    }

    /// Current value, falling back to the item's default when no state is stored
    pub fn value_of(&self, id: u16) -> Option<MenuValue> {
        match self.states.get(&id) {
            Some(state) => Some(state.value.clone()),
            None => self.items.get(&id).map(MenuItem::default_value),
        }
    }

    /// Number of items excluding the root
    pub fn len(&self) -> usize {
        self.items.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything except the root
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Depth-first walk starting below the root, `depth` is 0 for top level items
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(usize, &MenuItem),
    {
        self.walk_from(ROOT_ID, 0, &mut visit);
    }

    fn walk_from<F>(&self, parent_id: u16, depth: usize, visit: &mut F)
    where
        F: FnMut(usize, &MenuItem),
    {
        for item in self.children(parent_id) {
            visit(depth, item);
            if item.is_sub_menu() {
                self.walk_from(item.id, depth + 1, visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::item::{AnalogInfo, BooleanNaming};

    fn analog(id: u16) -> MenuItem {
        MenuItemBuilder::analog(id, format!("Analog {id}"), AnalogInfo::default()).build()
    }

    #[test]
    fn test_new_tree_has_only_root() {
        let tree = MenuTree::new();
        assert!(tree.is_empty());
        assert!(tree.root().is_sub_menu());
        assert!(tree.children(ROOT_ID).is_empty());
    }

    #[test]
    fn test_add_and_lookup() {
        let mut tree = MenuTree::new();
        assert_eq!(tree.add_item(ROOT_ID, analog(1)), Ok(AddOutcome::Added));
        tree.add_item(ROOT_ID, MenuItemBuilder::sub_menu(2, "Settings").build())
            .unwrap();
        tree.add_item(2, analog(3)).unwrap();

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.get_menu_by_id(3).unwrap().name, "Analog 3");
        assert_eq!(tree.parent_of(3).unwrap().id, 2);
        let top: Vec<u16> = tree.children(ROOT_ID).iter().map(|i| i.id).collect();
        assert_eq!(top, vec![1, 2]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut tree = MenuTree::new();
        tree.add_item(ROOT_ID, analog(1)).unwrap();
        tree.add_item(ROOT_ID, analog(2)).unwrap();
        let renamed = MenuItemBuilder::from_item(&analog(1)).name("Gain").build();
        assert_eq!(tree.add_item(ROOT_ID, renamed), Ok(AddOutcome::Replaced));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(ROOT_ID)[0].name, "Gain");
    }

    #[test]
    fn test_add_rejects_bad_parents() {
        let mut tree = MenuTree::new();
        tree.add_item(ROOT_ID, analog(1)).unwrap();
        assert_eq!(
            tree.add_item(1, analog(2)),
            Err(TreeError::NotASubMenu { id: 1 })
        );
        assert_eq!(
            tree.add_item(99, analog(2)),
            Err(TreeError::ItemNotFound { id: 99 })
        );
        assert_eq!(
            tree.add_item(ROOT_ID, MenuItemBuilder::action(0, "x").build()),
            Err(TreeError::ReservedId { id: 0 })
        );
    }

    #[test]
    fn test_states() {
        let mut tree = MenuTree::new();
        tree.add_item(
            ROOT_ID,
            MenuItemBuilder::boolean(4, "Power", BooleanNaming::OnOff).build(),
        )
        .unwrap();
        assert_eq!(tree.value_of(4), Some(MenuValue::Bool(false)));
        assert!(tree.change_state(4, MenuState::changed(MenuValue::Bool(true))));
        assert_eq!(tree.value_of(4), Some(MenuValue::Bool(true)));
        assert!(!tree.change_state(77, MenuState::new(MenuValue::Int(1))));
        assert_eq!(tree.value_of(77), None);
    }

    #[test]
    fn test_remove_submenu_removes_descendants() {
        let mut tree = MenuTree::new();
        tree.add_item(ROOT_ID, MenuItemBuilder::sub_menu(2, "Settings").build())
            .unwrap();
        tree.add_item(2, MenuItemBuilder::sub_menu(5, "Advanced").build())
            .unwrap();
        tree.add_item(5, analog(6)).unwrap();
        tree.add_item(ROOT_ID, analog(7)).unwrap();

        assert!(tree.remove_item(2).is_some());
        assert_eq!(tree.len(), 1);
        assert!(!tree.contains(5));
        assert!(!tree.contains(6));
        assert!(tree.contains(7));
    }

    #[test]
    fn test_walk_is_depth_first() {
        let mut tree = MenuTree::new();
        tree.add_item(ROOT_ID, MenuItemBuilder::sub_menu(1, "A").build())
            .unwrap();
        tree.add_item(1, analog(2)).unwrap();
        tree.add_item(ROOT_ID, analog(3)).unwrap();

        let mut seen = Vec::new();
        tree.walk(|depth, item| seen.push((depth, item.id)));
        assert_eq!(seen, vec![(0, 1), (1, 2), (0, 3)]);
    }
}

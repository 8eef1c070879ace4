//! Keeps the local [`MenuTree`] in step with the device
//!
//! Incoming bootstrap and change messages are applied here, and local edits
//! are validated and turned into outgoing change commands.

use embedctl_core::error::{ProtocolError, TreeError};
use embedctl_core::menu::{ItemKind, MenuItem, MenuState, MenuTree, MenuValue, ROOT_ID};
use embedctl_core::protocol::{ChangeData, CorrelationId, MenuCommand};
use std::collections::HashMap;
use tracing::{debug, warn};

/// An item whose definition or value changed
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEvent {
    pub item: MenuItem,
    /// Only the value changed, the definition is as before
    pub value_only: bool,
}

/// Result of finishing a bootstrap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// First completion since the bootstrap began
    pub first_completion: bool,
    /// Items whose parent never arrived
    pub orphans_dropped: usize,
}

/// Owner of the mirrored menu tree
#[derive(Debug, Default)]
pub struct MenuTreeSynchronizer {
    tree: MenuTree,
    /// Items that arrived before their parent, keyed by the missing parent id
    orphans: HashMap<u16, Vec<(MenuItem, MenuValue)>>,
    populated: bool,
}

impl MenuTreeSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    /// True once a bootstrap has completed
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    /// Forget the current tree ahead of a fresh bootstrap
    pub fn begin_bootstrap(&mut self) {
        self.tree.clear();
        self.orphans.clear();
        self.populated = false;
    }

    /// Add or replace an item received from the device
    pub fn apply_boot(&mut self, parent_id: u16, item: MenuItem, value: MenuValue) -> Vec<TreeEvent> {
        if !item.is_wire_type() {
            warn!(
                "Ignoring item {} of type {} from device",
                item.id,
                item.kind.name()
            );
            return Vec::new();
        }
        if parent_id != ROOT_ID && !self.tree.contains(parent_id) {
            debug!("Item {} waits for parent {}", item.id, parent_id);
            self.orphans.entry(parent_id).or_default().push((item, value));
            return Vec::new();
        }

        let mut events = Vec::new();
        self.insert(parent_id, item, value, &mut events);
        events
    }

    fn insert(&mut self, parent_id: u16, item: MenuItem, value: MenuValue, events: &mut Vec<TreeEvent>) {
        let id = item.id;
        if let Err(e) = self.tree.add_item(parent_id, item.clone()) {
            warn!("Dropping item {}: {}", id, e);
            return;
        }
        self.tree.change_state(id, MenuState::new(value));
        events.push(TreeEvent {
            item,
            value_only: false,
        });

        if let Some(waiting) = self.orphans.remove(&id) {
            for (child, child_value) in waiting {
                self.insert(id, child, child_value, events);
            }
        }
    }

    /// Finish the bootstrap; orphans still waiting are dropped
    pub fn complete_bootstrap(&mut self) -> BootstrapOutcome {
        let mut orphans_dropped = 0;
        for (parent_id, items) in self.orphans.drain() {
            let error = ProtocolError::OrphanedItems {
                parent_id,
                count: items.len(),
            };
            warn!("{}", error);
            orphans_dropped += items.len();
        }

        let first_completion = !self.populated;
        self.populated = true;
        BootstrapOutcome {
            first_completion,
            orphans_dropped,
        }
    }

    /// Apply a value change sent by the device
    ///
    /// Changes for unknown items or with unusable values are logged and
    /// ignored.
    pub fn apply_change(&mut self, item_id: u16, change: &ChangeData) -> Option<TreeEvent> {
        let Some(item) = self.tree.get_menu_by_id(item_id).cloned() else {
            warn!("Change for unknown item {}", item_id);
            return None;
        };
        let current = self
            .tree
            .value_of(item_id)
            .unwrap_or_else(|| item.default_value());

        let value = match change {
            ChangeData::Delta(delta) => current.apply_delta(&item.kind, *delta),
            ChangeData::Absolute(text) => MenuValue::parse_for(&item.kind, text),
            ChangeData::List(rows) => {
                matches!(item.kind, ItemKind::RuntimeList).then(|| MenuValue::List(rows.clone()))
            }
        };
        let Some(value) = value else {
            warn!("Change {:?} does not suit item {} ({})", change, item_id, item.kind.name());
            return None;
        };

        self.tree.change_state(item_id, MenuState::changed(value));
        Some(TreeEvent {
            item,
            value_only: true,
        })
    }

    /// Validate a local edit, apply it optimistically and build the command
    ///
    /// The tree keeps the new value even if the device never acknowledges it.
    pub fn prepare_change(
        &mut self,
        item_id: u16,
        change: ChangeData,
        correlation: CorrelationId,
    ) -> Result<(MenuCommand, MenuItem), TreeError> {
        let item = self
            .tree
            .get_menu_by_id(item_id)
            .filter(|item| item.id != ROOT_ID)
            .cloned()
            .ok_or(TreeError::ItemNotFound { id: item_id })?;
        if item.read_only {
            return Err(TreeError::ReadOnly { id: item_id });
        }
        if !item.is_client_editable() {
            return Err(TreeError::NotEditable { id: item_id });
        }

        let current = self
            .tree
            .value_of(item_id)
            .unwrap_or_else(|| item.default_value());
        let invalid = |value: String| TreeError::InvalidValue { id: item_id, value };

        let value = match (&item.kind, &change) {
            // actions carry no value, any change just triggers them
            (ItemKind::Action, _) => current,
            (_, ChangeData::Delta(delta)) => current
                .apply_delta(&item.kind, *delta)
                .ok_or_else(|| invalid(delta.to_string()))?,
            (_, ChangeData::Absolute(text)) => MenuValue::parse_for(&item.kind, text)
                .filter(|value| value.fits(&item))
                .ok_or_else(|| invalid(text.clone()))?,
            (ItemKind::RuntimeList, ChangeData::List(rows)) => MenuValue::List(rows.clone()),
            (_, ChangeData::List(rows)) => return Err(invalid(rows.join(","))),
        };

        self.tree.change_state(item_id, MenuState::changed(value));
        let command = MenuCommand::Change {
            correlation,
            item_id,
            change,
        };
        Ok((command, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedctl_core::menu::{AnalogInfo, BooleanNaming, MenuItemBuilder};

    fn analog(id: u16) -> MenuItem {
        MenuItemBuilder::analog(id, "Volume", AnalogInfo::default()).build()
    }

    #[test]
    fn test_bootstrap_builds_tree() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.begin_bootstrap();
        let events = sync.apply_boot(ROOT_ID, analog(5), MenuValue::Int(10));
        assert_eq!(events.len(), 1);
        assert!(!events[0].value_only);

        let outcome = sync.complete_bootstrap();
        assert!(outcome.first_completion);
        assert_eq!(outcome.orphans_dropped, 0);
        assert_eq!(sync.tree().value_of(5), Some(MenuValue::Int(10)));

        assert!(!sync.complete_bootstrap().first_completion);
    }

    #[test]
    fn test_orphans_are_adopted_when_parent_arrives() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.begin_bootstrap();
        assert!(sync.apply_boot(20, analog(21), MenuValue::Int(1)).is_empty());
        assert!(
            sync.apply_boot(10, MenuItemBuilder::sub_menu(20, "Inner").build(), MenuValue::Bool(false))
                .is_empty()
        );

        let events = sync.apply_boot(
            ROOT_ID,
            MenuItemBuilder::sub_menu(10, "Outer").build(),
            MenuValue::Bool(false),
        );
        let ids: Vec<u16> = events.iter().map(|e| e.item.id).collect();
        assert_eq!(ids, vec![10, 20, 21]);
        assert_eq!(sync.tree().parent_of(21).map(|p| p.id), Some(20));
        assert_eq!(sync.complete_bootstrap().orphans_dropped, 0);
    }

    #[test]
    fn test_unresolved_orphans_are_dropped() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.begin_bootstrap();
        sync.apply_boot(99, analog(1), MenuValue::Int(0));
        sync.apply_boot(99, analog(2), MenuValue::Int(0));

        let outcome = sync.complete_bootstrap();
        assert_eq!(outcome.orphans_dropped, 2);
        assert!(sync.tree().is_empty());
    }

    #[test]
    fn test_custom_builder_is_rejected() {
        let mut sync = MenuTreeSynchronizer::new();
        let item = MenuItemBuilder::custom_builder(3, "Wifi", "iot").build();
        assert!(sync.apply_boot(ROOT_ID, item, MenuValue::Text(String::new())).is_empty());
        assert!(!sync.tree().contains(3));
    }

    #[test]
    fn test_begin_bootstrap_resets() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.apply_boot(ROOT_ID, analog(5), MenuValue::Int(10));
        sync.apply_boot(77, analog(6), MenuValue::Int(10));
        sync.complete_bootstrap();

        sync.begin_bootstrap();
        assert!(sync.tree().is_empty());
        assert!(!sync.is_populated());
        assert_eq!(sync.complete_bootstrap().orphans_dropped, 0);
    }

    #[test]
    fn test_apply_change() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.apply_boot(ROOT_ID, analog(5), MenuValue::Int(10));

        let event = sync
            .apply_change(5, &ChangeData::Absolute("42".to_string()))
            .unwrap();
        assert!(event.value_only);
        assert_eq!(sync.tree().value_of(5), Some(MenuValue::Int(42)));
        assert!(sync.tree().get_state(5).unwrap().changed);

        sync.apply_change(5, &ChangeData::Delta(-2));
        assert_eq!(sync.tree().value_of(5), Some(MenuValue::Int(40)));

        assert!(sync.apply_change(9999, &ChangeData::Absolute("1".to_string())).is_none());
        assert!(sync.apply_change(5, &ChangeData::Absolute("loud".to_string())).is_none());
        assert_eq!(sync.tree().value_of(5), Some(MenuValue::Int(40)));
    }

    #[test]
    fn test_prepare_change_applies_optimistically() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.apply_boot(ROOT_ID, analog(5), MenuValue::Int(10));

        let (command, item) = sync
            .prepare_change(5, ChangeData::Absolute("42".to_string()), CorrelationId(9))
            .unwrap();
        assert_eq!(item.id, 5);
        assert_eq!(
            command,
            MenuCommand::Change {
                correlation: CorrelationId(9),
                item_id: 5,
                change: ChangeData::Absolute("42".to_string()),
            }
        );
        assert_eq!(sync.tree().value_of(5), Some(MenuValue::Int(42)));
    }

    #[test]
    fn test_prepare_change_validation() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.apply_boot(ROOT_ID, analog(5), MenuValue::Int(10));
        sync.apply_boot(
            ROOT_ID,
            MenuItemBuilder::boolean(6, "Locked", BooleanNaming::OnOff)
                .read_only(true)
                .build(),
            MenuValue::Bool(true),
        );
        sync.apply_boot(ROOT_ID, MenuItemBuilder::float(7, "Temp", 1).build(), MenuValue::Float(1.0));

        let id = CorrelationId(1);
        assert_eq!(
            sync.prepare_change(42, ChangeData::Delta(1), id).unwrap_err(),
            TreeError::ItemNotFound { id: 42 }
        );
        assert_eq!(
            sync.prepare_change(6, ChangeData::Absolute("0".into()), id).unwrap_err(),
            TreeError::ReadOnly { id: 6 }
        );
        assert_eq!(
            sync.prepare_change(7, ChangeData::Absolute("2.0".into()), id).unwrap_err(),
            TreeError::NotEditable { id: 7 }
        );
        assert_eq!(
            sync.prepare_change(5, ChangeData::Absolute("500".into()), id).unwrap_err(),
            TreeError::InvalidValue {
                id: 5,
                value: "500".to_string()
            }
        );
        assert_eq!(
            sync.prepare_change(0, ChangeData::Delta(1), id).unwrap_err(),
            TreeError::ItemNotFound { id: 0 }
        );
        assert_eq!(sync.tree().value_of(5), Some(MenuValue::Int(10)));
    }

    #[test]
    fn test_action_accepts_any_change() {
        let mut sync = MenuTreeSynchronizer::new();
        sync.apply_boot(ROOT_ID, MenuItemBuilder::action(3, "Save").build(), MenuValue::Bool(false));
        assert!(sync.prepare_change(3, ChangeData::Delta(1), CorrelationId(4)).is_ok());
    }
}

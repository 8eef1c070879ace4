//! # Menu Model
//!
//! Client-side representation of a device's menu: item definitions, their
//! current values and the tree that ties them together.

pub mod item;
pub mod state;
pub mod tree;

pub use item::{
    AnalogInfo, BooleanNaming, EditItemType, ItemKind, MenuItem, MenuItemBuilder,
    ScrollChoiceMode,
};
pub use state::{MenuState, MenuValue, RgbColor, ScrollPosition};
pub use tree::{AddOutcome, MenuTree, ROOT_ID};

//! Callbacks a [`RemoteController`](super::RemoteController) delivers

use embedctl_core::menu::MenuItem;
use embedctl_core::protocol::{AckStatus, CorrelationId, DialogCommand};
use embedctl_core::remote::{AuthStatus, RemoteInformation};
use uuid::Uuid;

/// Receives connection and menu events from a controller
///
/// All callbacks run on the controller task one at a time, in the order the
/// events happened. They must return quickly; hand long work to another task.
/// Every method has an empty default so implementors pick what they need.
pub trait RemoteControllerListener: Send + Sync {
    /// The connection moved to `status`
    fn connection_state(&self, _remote: &RemoteInformation, _status: AuthStatus) {}

    /// An item was added or its value changed
    ///
    /// `value_only` is true when only the current value changed.
    fn menu_item_changed(&self, _item: &MenuItem, _value_only: bool) {}

    /// A bootstrap has completed and the tree is whole
    fn tree_fully_populated(&self) {}

    /// The device acknowledged a command we sent
    ///
    /// `item` is the item the command changed, `None` for dialog actions.
    fn ack_received(&self, _correlation: CorrelationId, _item: Option<&MenuItem>, _status: AckStatus) {}

    fn dialog_update(&self, _dialog: &DialogCommand) {}

    /// The device identified itself with a different UUID than configured
    fn remote_uuid_mismatch(&self, _expected: Uuid, _actual: Uuid) {}
}

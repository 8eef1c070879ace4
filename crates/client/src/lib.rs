//! Client-side library for embedctl
//!
//! Transports to menu devices, the tree synchroniser and the
//! [`RemoteController`] that ties them together.

pub mod controller;
pub mod pairing;
pub mod sync;
pub mod tracker;
pub mod transport;
pub mod transport_factory;

pub use controller::{RemoteController, RemoteControllerListener};
pub use pairing::{PairingOutcome, pair_with_device};
pub use sync::{BootstrapOutcome, MenuTreeSynchronizer, TreeEvent};
pub use tracker::CorrelationTracker;
pub use transport::{Transport, TransportEvent};
pub use transport_factory::{create_transport, create_transport_with_timeout};

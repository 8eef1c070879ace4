//! # Protocol Layer
//!
//! Typed messages exchanged with a menu device and the tag/value codec that
//! turns them into frames.
//!
//! ## Message Flow
//!
//! ```text
//! Client → Device: Join, Heartbeat(start)
//! Device → Client: Join, Bootstrap(start), item boots..., Bootstrap(end)
//! Client ↔ Device: Change / Ack, Heartbeat, Dialog
//! ```

pub mod codec;
pub mod command;
pub mod fields;

pub use codec::{Decoded, FrameDecoder, boot_tag, decode_frame, encode};
pub use command::{
    AckStatus, BootPhase, ChangeData, CorrelationId, DialogButton, DialogCommand, DialogMode,
    HeartbeatMode, MenuCommand,
};
pub use fields::MAX_FRAME_LEN;

/// API version this client reports, `major * 100 + minor`
pub const API_VERSION: u16 = 412;

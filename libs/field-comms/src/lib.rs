//! Message codec and transport layer for the field electronics.
//!
//! The field is a fleet of small controllers exchanging compact typed
//! messages. The graph looks like this:
//!
//! ```text
//!                       JMS (server)
//!                          |
//!                          | serial, length-prefixed frames
//!                         \/
//!                    Scoring Table
//!                          |
//!                          | CAN, chunked packets
//!          /---------------+---------------\
//!         \/                               \/
//!      Red Alliance                   Blue Alliance
//!   (estops + lights)               (estops + lights)
//! ```
//!
//! Every wire message is an [`AddressedMessage`]: the sender's [`Role`]
//! followed by one [`Message`]. The byte layout is fixed and documented in
//! [`wire`]; [`serial`] reassembles length-prefixed frames from an
//! arbitrarily fragmented byte stream, and [`can`] splits messages into
//! 8-byte bus packets behind a header packet. [`comms`] routes between the
//! two by destination device id.
//!
//! One node generation hangs every role off a single serial link
//! (device id 0); the other addresses nodes over CAN by id. Both are
//! plain configuration here, see [`comms::NodeConfig`].

#![cfg_attr(any(not(test), target_arch = "arm"), no_std)]

pub mod can;
pub mod comms;
pub mod definitions;
pub mod serial;
pub mod wire;

pub use comms::{Comms, NodeConfig};
pub use definitions::{AddressedMessage, Colour, EstopStates, LightMode, Message, Role};

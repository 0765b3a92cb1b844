//! Handoff primitives between interrupt context and the polling loop.
//!
//! Interrupt handlers must never touch the codec or the framing state
//! machines; they post a flag or a pre-built value here, and the polling
//! loop is the only consumer. Both primitives are safe to use from an
//! interrupt: no waiting, no allocation, critical sections a few
//! instructions long.

#![cfg_attr(any(not(test), target_arch = "arm"), no_std)]

pub mod flag;
pub mod slot;

pub use flag::Flag;
pub use slot::Slot;

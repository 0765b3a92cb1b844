//! Length-prefixed framing over a byte-oriented serial link.
//!
//! One frame is `[u8 length][length bytes of encoded AddressedMessage]`
//! with `1 <= length <= 63`. Incoming bytes may arrive arbitrarily
//! fragmented; [`SerialLink::poll`] reassembles at most one frame per call
//! and never blocks.

#[cfg(test)]
use log::warn;

#[cfg(not(test))]
use defmt::warn;

use crate::definitions::AddressedMessage;
use crate::wire::{self, Decode, Encode, Sink, SliceSource};

/// Largest encoded message one frame can carry.
pub const MAX_FRAME_PAYLOAD: usize = 63;

/// Byte-sink/byte-source pair the framer runs on. Port bring-up (baud
/// rate, pins) belongs to the hardware implementation.
pub trait SerialPort {
    type Error;

    /// Queues all of `bytes` for transmission.
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Bytes ready to read right now.
    fn available(&mut self) -> usize;

    /// Reads up to `buf.len()` bytes, returning how many were read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SendError<E> {
    /// The encoded message is empty or does not fit one frame.
    FrameTooLarge,
    Io(E),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReceiveError<E> {
    /// The incoming length byte exceeds [`MAX_FRAME_PAYLOAD`].
    FrameTooLarge,
    Wire(wire::Error),
    Io(E),
}

/// Framer and reassembler for one serial link.
///
/// Reassembly state lives here, owned exclusively by the link: the count of
/// body bytes still expected, the count already read, and the frame buffer.
pub struct SerialLink<P: SerialPort> {
    port: P,
    to_read: usize,
    n_read: usize,
    buf: [u8; MAX_FRAME_PAYLOAD],
    stale_limit: Option<u32>,
    stale_polls: u32,
}

impl<P: SerialPort> SerialLink<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            to_read: 0,
            n_read: 0,
            buf: [0; MAX_FRAME_PAYLOAD],
            stale_limit: None,
            stale_polls: 0,
        }
    }

    /// Resets a frame stuck mid-reassembly after `polls` consecutive
    /// dataless polls. Off by default: a partial frame normally persists
    /// until its bytes arrive.
    #[allow(clippy::missing_const_for_fn)]
    #[must_use]
    pub fn with_reassembly_timeout(mut self, polls: u32) -> Self {
        self.stale_limit = Some(polls);
        self
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Drops any frame in progress.
    pub fn reset(&mut self) {
        self.to_read = 0;
        self.n_read = 0;
        self.stale_polls = 0;
    }

    /// Encodes `msg` and writes the whole frame in one `write` call.
    pub fn send(&mut self, msg: &AddressedMessage) -> Result<(), SendError<P::Error>> {
        let mut frame = heapless::Vec::<u8, { MAX_FRAME_PAYLOAD + 1 }>::new();
        frame.try_push(0).ok();
        msg.encode(&mut frame)
            .map_err(|_| SendError::FrameTooLarge)?;

        let count = frame.len() - 1;
        if count == 0 {
            return Err(SendError::FrameTooLarge);
        }
        frame[0] = count as u8;
        self.port.write(&frame).map_err(SendError::Io)
    }

    /// Advances reassembly by at most one step: an idle link with data
    /// reads the length byte; a link mid-frame reads whatever body bytes
    /// are ready. Returns the decoded message once the frame completes,
    /// `Ok(None)` otherwise. A poll with nothing available is a no-op.
    pub fn poll(&mut self) -> Result<Option<AddressedMessage>, ReceiveError<P::Error>> {
        let avail = self.port.available();
        if avail == 0 {
            if self.to_read > 0 {
                self.stale_polls += 1;
                if let Some(limit) = self.stale_limit {
                    if self.stale_polls >= limit {
                        warn!("dropping stale frame after {} empty polls", self.stale_polls);
                        self.reset();
                    }
                }
            }
            return Ok(None);
        }
        self.stale_polls = 0;

        if self.to_read == 0 {
            let mut length = [0u8; 1];
            self.port.read(&mut length).map_err(ReceiveError::Io)?;
            let length = usize::from(length[0]);
            if length > MAX_FRAME_PAYLOAD {
                warn!("rejecting frame length {}", length);
                return Err(ReceiveError::FrameTooLarge);
            }
            // A zero length leaves the link idle; zero-length frames do
            // not exist.
            self.to_read = length;
            self.n_read = 0;
            return Ok(None);
        }

        let want = avail.min(self.to_read - self.n_read);
        let n = self
            .port
            .read(&mut self.buf[self.n_read..self.n_read + want])
            .map_err(ReceiveError::Io)?;
        self.n_read += n;

        if self.n_read < self.to_read {
            return Ok(None);
        }

        let decoded = {
            let mut source = SliceSource::new(&self.buf[..self.to_read]);
            AddressedMessage::decode(&mut source)
        };
        self.to_read = 0;
        self.n_read = 0;
        decoded.map(Some).map_err(ReceiveError::Wire)
    }
}

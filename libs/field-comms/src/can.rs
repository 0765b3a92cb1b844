//! Chunked packet transport over a CAN bus.
//!
//! A CAN frame carries at most 8 payload bytes, so one encoded message goes
//! out as a header packet `[n_packets][total_size]` followed by `n_packets`
//! data packets, all addressed to the destination device id. The receiver
//! filters on its own id and reassembles a whole message within one poll;
//! anything short of a complete, consistent sequence is an error, never a
//! partial message.

#[cfg(test)]
use log::warn;

#[cfg(not(test))]
use defmt::warn;

use crate::definitions::AddressedMessage;
use crate::wire::{self, Decode, SliceSource};

/// Payload bytes per data packet.
pub const CHUNK_SIZE: usize = 8;

/// Largest encoded message the one-byte header size field can declare.
pub const MAX_MESSAGE: usize = 255;

/// The CAN peripheral contract. Ids are extended CAN ids.
pub trait CanBus {
    type Error;

    /// Starts an outgoing packet addressed to `id`.
    fn begin_packet(&mut self, id: u32) -> Result<(), Self::Error>;

    /// Appends one payload byte to the open packet.
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Transmits the open packet.
    fn end_packet(&mut self) -> Result<(), Self::Error>;

    /// Takes the next pending incoming packet, returning its payload size,
    /// or 0 when nothing is pending.
    fn parse_packet(&mut self) -> usize;

    /// Restricts reception to packets addressed to `id`.
    fn filter(&mut self, id: u32);

    /// Unread payload bytes of the current packet.
    fn available(&mut self) -> usize;

    /// Reads one payload byte of the current packet.
    fn read(&mut self) -> Option<u8>;
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SendError<E> {
    /// The encoded message exceeds [`MAX_MESSAGE`].
    MessageTooLarge,
    /// The bus rejected a packet; the whole message was abandoned.
    Bus(E),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReceiveError<E> {
    /// The header packet is malformed or inconsistent.
    BadHeader,
    /// Fewer packets or payload bytes arrived than the header declared.
    Underrun,
    Wire(wire::Error),
    Bus(E),
}

/// Chunker and reassembler for one CAN bus, filtered to one device id.
pub struct CanLink<B: CanBus> {
    bus: B,
    device_id: u32,
}

impl<B: CanBus> CanLink<B> {
    pub fn new(bus: B, device_id: u32) -> Self {
        Self { bus, device_id }
    }

    pub const fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Encodes `msg` and transmits it to `dest` as a header packet plus
    /// data packets of up to [`CHUNK_SIZE`] bytes. Any packet failure
    /// abandons the whole message; retrying means resending all of it.
    pub fn send_to(&mut self, msg: &AddressedMessage, dest: u32) -> Result<(), SendError<B::Error>> {
        let data: heapless::Vec<u8, MAX_MESSAGE> =
            wire::to_vec(msg).map_err(|_| SendError::MessageTooLarge)?;
        let n_packets = data.len().div_ceil(CHUNK_SIZE);

        self.bus.begin_packet(dest).map_err(SendError::Bus)?;
        self.bus.write(n_packets as u8).map_err(SendError::Bus)?;
        self.bus.write(data.len() as u8).map_err(SendError::Bus)?;
        self.bus.end_packet().map_err(SendError::Bus)?;

        for chunk in data.chunks(CHUNK_SIZE) {
            self.bus.begin_packet(dest).map_err(SendError::Bus)?;
            for &byte in chunk {
                self.bus.write(byte).map_err(SendError::Bus)?;
            }
            self.bus.end_packet().map_err(SendError::Bus)?;
        }
        Ok(())
    }

    /// Collects one complete message addressed to this device, or
    /// `Ok(None)` when nothing is pending. Reassembly happens within the
    /// one call; a sequence that cannot complete is reported rather than
    /// returned partially filled.
    pub fn poll(&mut self) -> Result<Option<AddressedMessage>, ReceiveError<B::Error>> {
        self.bus.filter(self.device_id);
        if self.bus.parse_packet() == 0 {
            return Ok(None);
        }

        let n_packets = self.bus.read().ok_or(ReceiveError::BadHeader)?;
        let size = self.bus.read().ok_or(ReceiveError::BadHeader)?;
        if self.bus.available() != 0 || n_packets == 0 || size == 0 {
            warn!("bad header read");
            return Err(ReceiveError::BadHeader);
        }
        let size = usize::from(size);
        if size > usize::from(n_packets) * CHUNK_SIZE {
            warn!(
                "header declares {} bytes in {} packets",
                size, n_packets
            );
            return Err(ReceiveError::BadHeader);
        }

        let mut data = heapless::Vec::<u8, MAX_MESSAGE>::new();
        for _ in 0..n_packets {
            if self.bus.parse_packet() == 0 {
                return Err(ReceiveError::Underrun);
            }
            while let Some(byte) = self.bus.read() {
                // Bytes past the declared size (a sender that pads its
                // final packet) are read and discarded.
                if data.len() < size {
                    data.push(byte).ok();
                }
            }
        }
        if data.len() < size {
            return Err(ReceiveError::Underrun);
        }

        let mut source = SliceSource::new(&data);
        AddressedMessage::decode(&mut source)
            .map(Some)
            .map_err(ReceiveError::Wire)
    }
}

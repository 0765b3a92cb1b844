//! Fixed byte layout of every message type.
//!
//! One encoded [`AddressedMessage`] is `[role][discriminant][payload...]`.
//! Discriminants are one byte, multi-byte integers are little-endian, and
//! container payloads carry a one-byte count directly before the elements.
//! Decoding an unknown discriminant consumes only the discriminant byte and
//! yields the type's default; it never fails. Framing (length prefixes,
//! packet headers) lives in [`crate::serial`] and [`crate::can`].

use defmt::Format;

use crate::definitions::{
    AddressedMessage, Colour, EstopStates, LightMode, Message, Role, LIGHT_ZONES,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub enum Error {
    /// The source ran out of bytes mid-value.
    UnexpectedEnd,
    /// The sink ran out of capacity.
    Overflow,
}

pub type Result<T> = core::result::Result<T, Error>;

/// Write-one-byte cursor the encoder appends to.
pub trait Sink {
    fn try_push(&mut self, byte: u8) -> Result<()>;

    fn try_extend(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.try_push(byte)?;
        }
        Ok(())
    }
}

impl<const N: usize> Sink for heapless::Vec<u8, N> {
    fn try_push(&mut self, byte: u8) -> Result<()> {
        self.push(byte).map_err(|_| Error::Overflow)
    }

    fn try_extend(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes).map_err(|_| Error::Overflow)
    }
}

/// Read-one-byte cursor the decoder consumes from.
pub trait Source {
    fn pop(&mut self) -> Result<u8>;
}

/// [`Source`] over a byte slice, advancing past what it hands out.
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes handed out so far.
    pub const fn consumed(&self) -> usize {
        self.pos
    }

    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

impl Source for SliceSource<'_> {
    fn pop(&mut self) -> Result<u8> {
        let byte = *self.bytes.get(self.pos).ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(byte)
    }
}

pub trait Encode {
    fn encode<S: Sink>(&self, sink: &mut S) -> Result<()>;
}

pub trait Decode: Sized {
    fn decode<R: Source>(source: &mut R) -> Result<Self>;
}

/// Encodes `value` into a fresh bounded buffer.
pub fn to_vec<E: Encode, const N: usize>(value: &E) -> Result<heapless::Vec<u8, N>> {
    let mut buf = heapless::Vec::new();
    value.encode(&mut buf)?;
    Ok(buf)
}

fn pop_u16_le<R: Source>(source: &mut R) -> Result<u16> {
    let lo = source.pop()?;
    let hi = source.pop()?;
    Ok(u16::from_le_bytes([lo, hi]))
}

impl Encode for Role {
    fn encode<S: Sink>(&self, sink: &mut S) -> Result<()> {
        sink.try_push(*self as u8)
    }
}

impl Decode for Role {
    fn decode<R: Source>(source: &mut R) -> Result<Self> {
        Ok(match source.pop()? {
            0 => Self::Jms,
            1 => Self::ScoringTable,
            2 => Self::BlueDs,
            3 => Self::RedDs,
            _ => Self::default(),
        })
    }
}

impl Encode for Colour {
    fn encode<S: Sink>(&self, sink: &mut S) -> Result<()> {
        sink.try_extend(&[self.red, self.green, self.blue])
    }
}

impl Decode for Colour {
    fn decode<R: Source>(source: &mut R) -> Result<Self> {
        Ok(Self {
            red: source.pop()?,
            green: source.pop()?,
            blue: source.pop()?,
        })
    }
}

impl Encode for EstopStates {
    fn encode<S: Sink>(&self, sink: &mut S) -> Result<()> {
        sink.try_push(self.to_bits())
    }
}

impl Decode for EstopStates {
    fn decode<R: Source>(source: &mut R) -> Result<Self> {
        Ok(Self::from_bits(source.pop()?))
    }
}

impl Encode for LightMode {
    fn encode<S: Sink>(&self, sink: &mut S) -> Result<()> {
        match self {
            Self::Off => sink.try_push(0),
            Self::Constant(colour) => {
                sink.try_push(1)?;
                colour.encode(sink)
            }
            Self::Pulse(colour, duration) => {
                sink.try_push(2)?;
                colour.encode(sink)?;
                sink.try_extend(&duration.to_le_bytes())
            }
            Self::Chase(colour, duration) => {
                sink.try_push(3)?;
                colour.encode(sink)?;
                sink.try_extend(&duration.to_le_bytes())
            }
            Self::Rainbow(duration) => {
                sink.try_push(4)?;
                sink.try_extend(&duration.to_le_bytes())
            }
        }
    }
}

impl Decode for LightMode {
    fn decode<R: Source>(source: &mut R) -> Result<Self> {
        Ok(match source.pop()? {
            0 => Self::Off,
            1 => Self::Constant(Colour::decode(source)?),
            2 => Self::Pulse(Colour::decode(source)?, pop_u16_le(source)?),
            3 => Self::Chase(Colour::decode(source)?, pop_u16_le(source)?),
            4 => Self::Rainbow(pop_u16_le(source)?),
            _ => Self::default(),
        })
    }
}

impl Encode for Message {
    fn encode<S: Sink>(&self, sink: &mut S) -> Result<()> {
        match self {
            Self::Ping => sink.try_push(0),
            Self::Estops(estops) => {
                sink.try_push(1)?;
                estops.encode(sink)
            }
            Self::SetLights(zones) => {
                sink.try_push(2)?;
                sink.try_push(zones.len() as u8)?;
                for zone in zones {
                    zone.encode(sink)?;
                }
                Ok(())
            }
        }
    }
}

impl Decode for Message {
    fn decode<R: Source>(source: &mut R) -> Result<Self> {
        Ok(match source.pop()? {
            0 => Self::Ping,
            1 => Self::Estops(EstopStates::decode(source)?),
            2 => {
                let count = source.pop()?;
                let mut zones = [LightMode::Off; LIGHT_ZONES];
                // Entries past the zone count are still consumed so the
                // cursor ends exactly past the message.
                for i in 0..usize::from(count) {
                    let mode = LightMode::decode(source)?;
                    if let Some(zone) = zones.get_mut(i) {
                        *zone = mode;
                    }
                }
                Self::SetLights(zones)
            }
            _ => Self::default(),
        })
    }
}

impl Encode for AddressedMessage {
    fn encode<S: Sink>(&self, sink: &mut S) -> Result<()> {
        self.role.encode(sink)?;
        self.msg.encode(sink)
    }
}

impl Decode for AddressedMessage {
    fn decode<R: Source>(source: &mut R) -> Result<Self> {
        Ok(Self {
            role: Role::decode(source)?,
            msg: Message::decode(source)?,
        })
    }
}

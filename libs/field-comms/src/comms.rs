//! Per-node transport dispatch.
//!
//! Device id 0 is the JMS server at the end of the serial line; every other
//! id is a node on the CAN bus. Outgoing messages route by destination id,
//! incoming polls route by the configured upstream: the single-serial-link
//! node generation listens on the stream (upstream 0), the CAN generation
//! polls the bus filtered to its own id.

use defmt::Format;

use crate::can::{self, CanBus, CanLink};
use crate::definitions::{AddressedMessage, Role};
use crate::serial::{self, SerialLink, SerialPort};

/// Device id of the JMS server, and the marker for serial dispatch.
pub const JMS_DEVICE_ID: u32 = 0;

/// Baud rate of the serial link to the JMS server.
pub const SERIAL_BAUD: u32 = 115_200;

/// CAN bitrates the field transceivers support.
pub mod bitrate {
    pub const K1000: u32 = 1_000_000;
    pub const K500: u32 = 500_000;
    pub const K250: u32 = 250_000;
    pub const K200: u32 = 200_000;
    pub const K125: u32 = 125_000;
    pub const K100: u32 = 100_000;
    pub const K80: u32 = 80_000;
    pub const K50: u32 = 50_000;
    pub const K40: u32 = 40_000;
    pub const K20: u32 = 20_000;
    pub const K10: u32 = 10_000;
    pub const K5: u32 = 5_000;
}

/// A node's fixed identity and link rates, set once at startup. Board
/// bring-up reads the rates when configuring the peripherals; the links
/// themselves never touch hardware configuration.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub struct NodeConfig {
    pub role: Role,
    pub device_id: u32,
    /// Device id messages are expected from; 0 selects the stream path.
    pub upstream_id: u32,
    pub serial_baud: u32,
    pub can_bitrate: u32,
}

impl NodeConfig {
    pub const fn new(role: Role, device_id: u32) -> Self {
        Self {
            role,
            device_id,
            upstream_id: JMS_DEVICE_ID,
            serial_baud: SERIAL_BAUD,
            can_bitrate: bitrate::K500,
        }
    }

    #[allow(clippy::missing_const_for_fn)]
    #[must_use]
    pub fn with_upstream(mut self, upstream_id: u32) -> Self {
        self.upstream_id = upstream_id;
        self
    }

    #[allow(clippy::missing_const_for_fn)]
    #[must_use]
    pub fn with_serial_baud(mut self, baud: u32) -> Self {
        self.serial_baud = baud;
        self
    }

    #[allow(clippy::missing_const_for_fn)]
    #[must_use]
    pub fn with_can_bitrate(mut self, bitrate: u32) -> Self {
        self.can_bitrate = bitrate;
        self
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SendError<S, C> {
    Serial(serial::SendError<S>),
    Can(can::SendError<C>),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ReceiveError<S, C> {
    Serial(serial::ReceiveError<S>),
    Can(can::ReceiveError<C>),
}

/// Both transports of one node, routed by device id.
pub struct Comms<P: SerialPort, B: CanBus> {
    serial: SerialLink<P>,
    can: CanLink<B>,
    config: NodeConfig,
}

impl<P: SerialPort, B: CanBus> Comms<P, B> {
    pub fn new(serial_port: P, can_bus: B, config: NodeConfig) -> Self {
        Self {
            serial: SerialLink::new(serial_port),
            can: CanLink::new(can_bus, config.device_id),
            config,
        }
    }

    pub const fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn serial_mut(&mut self) -> &mut SerialLink<P> {
        &mut self.serial
    }

    pub fn can_mut(&mut self) -> &mut CanLink<B> {
        &mut self.can
    }

    /// Sends `msg` to the node with id `dest`: the serial frame path for
    /// the JMS server, the chunked CAN path for everything else.
    pub fn send_to(
        &mut self,
        msg: &AddressedMessage,
        dest: u32,
    ) -> Result<(), SendError<P::Error, B::Error>> {
        if dest == JMS_DEVICE_ID {
            self.serial.send(msg).map_err(SendError::Serial)
        } else {
            self.can.send_to(msg, dest).map_err(SendError::Can)
        }
    }

    /// Polls the transport the configured upstream arrives on.
    pub fn receive(
        &mut self,
    ) -> Result<Option<AddressedMessage>, ReceiveError<P::Error, B::Error>> {
        if self.config.upstream_id == JMS_DEVICE_ID {
            self.receive_stream()
        } else {
            self.can.poll().map_err(ReceiveError::Can)
        }
    }

    /// Polls the serial link regardless of the configured upstream.
    pub fn receive_stream(
        &mut self,
    ) -> Result<Option<AddressedMessage>, ReceiveError<P::Error, B::Error>> {
        self.serial.poll().map_err(ReceiveError::Serial)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::definitions::{EstopStates, Message};

    #[derive(Default)]
    struct MockPort {
        incoming: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl SerialPort for MockPort {
        type Error = core::convert::Infallible;

        fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn available(&mut self) -> usize {
            self.incoming.len()
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            for slot in buf.iter_mut() {
                match self.incoming.pop_front() {
                    Some(byte) => {
                        *slot = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    #[derive(Default)]
    struct MockBus {
        filter_id: Option<u32>,
        open: Vec<u8>,
        open_id: u32,
        sent: Vec<(u32, Vec<u8>)>,
        incoming: VecDeque<(u32, Vec<u8>)>,
        reading: VecDeque<u8>,
    }

    impl CanBus for MockBus {
        type Error = ();

        fn begin_packet(&mut self, id: u32) -> Result<(), ()> {
            self.open_id = id;
            self.open.clear();
            Ok(())
        }

        fn write(&mut self, byte: u8) -> Result<(), ()> {
            self.open.push(byte);
            Ok(())
        }

        fn end_packet(&mut self) -> Result<(), ()> {
            self.sent.push((self.open_id, self.open.clone()));
            Ok(())
        }

        fn parse_packet(&mut self) -> usize {
            while let Some((id, payload)) = self.incoming.pop_front() {
                if self.filter_id.map_or(true, |filter| filter == id) {
                    self.reading = payload.into();
                    return self.reading.len();
                }
            }
            0
        }

        fn filter(&mut self, id: u32) {
            self.filter_id = Some(id);
        }

        fn available(&mut self) -> usize {
            self.reading.len()
        }

        fn read(&mut self) -> Option<u8> {
            self.reading.pop_front()
        }
    }

    fn estops() -> AddressedMessage {
        AddressedMessage::new(
            Role::ScoringTable,
            Message::Estops(EstopStates {
                field: true,
                ..EstopStates::default()
            }),
        )
    }

    fn scoring_table() -> Comms<MockPort, MockBus> {
        Comms::new(
            MockPort::default(),
            MockBus::default(),
            NodeConfig::new(Role::ScoringTable, 1),
        )
    }

    #[test]
    fn destination_zero_goes_out_serial() {
        let mut comms = scoring_table();
        comms.send_to(&estops(), JMS_DEVICE_ID).unwrap();
        assert_eq!(comms.serial_mut().port_mut().written, vec![3, 1, 1, 1]);
        assert!(comms.can_mut().bus_mut().sent.is_empty());
    }

    #[test]
    fn nonzero_destination_goes_out_can() {
        let mut comms = scoring_table();
        comms.send_to(&estops(), 2).unwrap();
        assert!(comms.serial_mut().port_mut().written.is_empty());
        let sent = &comms.can_mut().bus_mut().sent;
        assert_eq!(sent[0], (2, vec![1, 3]));
        assert_eq!(sent[1], (2, vec![1, 1, 1]));
    }

    #[test]
    fn stream_upstream_receives_serial_frames() {
        let mut comms = scoring_table();
        comms
            .serial_mut()
            .port_mut()
            .incoming
            .extend([2u8, 3, 0]);
        assert_eq!(comms.receive(), Ok(None));
        assert_eq!(
            comms.receive(),
            Ok(Some(AddressedMessage::new(Role::RedDs, Message::Ping)))
        );
    }

    #[test]
    fn can_upstream_receives_filtered_packets() {
        let mut comms = Comms::new(
            MockPort::default(),
            MockBus::default(),
            NodeConfig::new(Role::BlueDs, 3).with_upstream(1),
        );
        comms
            .can_mut()
            .bus_mut()
            .incoming
            .push_back((3, vec![1, 2]));
        comms
            .can_mut()
            .bus_mut()
            .incoming
            .push_back((3, vec![3, 0]));
        assert_eq!(
            comms.receive(),
            Ok(Some(AddressedMessage::new(Role::RedDs, Message::Ping)))
        );
    }

    #[test]
    fn receive_stream_overrides_can_upstream() {
        let mut comms = Comms::new(
            MockPort::default(),
            MockBus::default(),
            NodeConfig::new(Role::BlueDs, 3).with_upstream(1),
        );
        comms
            .serial_mut()
            .port_mut()
            .incoming
            .extend([2u8, 3, 0]);
        assert_eq!(comms.receive_stream(), Ok(None));
        assert_eq!(
            comms.receive_stream(),
            Ok(Some(AddressedMessage::new(Role::RedDs, Message::Ping)))
        );
        assert!(comms.can_mut().bus_mut().filter_id.is_none());
    }

    #[test]
    fn config_defaults() {
        let config = NodeConfig::new(Role::RedDs, 2);
        assert_eq!(config.upstream_id, JMS_DEVICE_ID);
        assert_eq!(config.serial_baud, SERIAL_BAUD);
        assert_eq!(config.can_bitrate, bitrate::K500);

        let config = config.with_upstream(1).with_can_bitrate(bitrate::K250);
        assert_eq!(config.upstream_id, 1);
        assert_eq!(config.can_bitrate, bitrate::K250);
    }
}

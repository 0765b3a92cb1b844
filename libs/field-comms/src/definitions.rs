use defmt::Format;

/// Light zones driven by one alliance-station node.
pub const LIGHT_ZONES: usize = 4;

/// Logical sender/recipient class of a node. The wire byte is the ordinal.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Format)]
pub enum Role {
    #[default]
    Jms = 0,
    ScoringTable = 1,
    BlueDs = 2,
    RedDs = 3,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub struct Colour {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// Field and per-alliance estop button states.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Format)]
pub struct EstopStates {
    pub field: bool,
    pub red: [bool; 3],
    pub blue: [bool; 3],
}

impl EstopStates {
    /// bit0 = field, bits 1-3 = red stations, bits 4-6 = blue stations
    pub fn to_bits(self) -> u8 {
        u8::from(self.field)
            | u8::from(self.red[0]) << 1
            | u8::from(self.red[1]) << 2
            | u8::from(self.red[2]) << 3
            | u8::from(self.blue[0]) << 4
            | u8::from(self.blue[1]) << 5
            | u8::from(self.blue[2]) << 6
    }

    /// Bit 7 is ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            field: bits & 0x01 != 0,
            red: [bits & 0x02 != 0, bits & 0x04 != 0, bits & 0x08 != 0],
            blue: [bits & 0x10 != 0, bits & 0x20 != 0, bits & 0x40 != 0],
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Format)]
pub enum LightMode {
    #[default]
    Off,
    Constant(Colour),
    /// ms
    Pulse(Colour, u16),
    /// ms
    Chase(Colour, u16),
    /// ms
    Rainbow(u16),
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Format)]
pub enum Message {
    #[default]
    Ping,
    Estops(EstopStates),
    SetLights([LightMode; LIGHT_ZONES]),
}

impl Message {
    /// Builds a `SetLights` from up to [`LIGHT_ZONES`] modes. Missing zones
    /// stay [`LightMode::Off`]; extra entries are dropped.
    pub fn set_lights(modes: &[LightMode]) -> Self {
        let mut zones = [LightMode::Off; LIGHT_ZONES];
        for (zone, mode) in zones.iter_mut().zip(modes) {
            *zone = *mode;
        }
        Self::SetLights(zones)
    }
}

/// The unit of transmission: every wire message carries its sender role.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Format)]
pub struct AddressedMessage {
    pub role: Role,
    pub msg: Message,
}

impl AddressedMessage {
    pub const fn new(role: Role, msg: Message) -> Self {
        Self { role, msg }
    }
}

//! Wire-level and decoded command records.

use serde::Serialize;
use smallvec::SmallVec;

use crate::command_type::CommandType;
use crate::options::CommandOptions;

/// Parameter storage. Almost every command carries at most six slots.
pub type Params = SmallVec<[f64; 8]>;

/// A unit command as it appears on the wire.
///
/// # Examples
///
/// ```
/// use sdfz_command::RawCommand;
///
/// let raw = RawCommand::new(10, 32, &[100.0, 0.0, 250.0]).with_unit(17);
/// assert_eq!(raw.command_id, 10);
/// assert_eq!(raw.params.len(), 3);
/// assert_eq!(raw.unit_id, Some(17));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RawCommand {
    /// Command id. Negative ids are build orders.
    pub command_id: i32,
    /// Option bitmask.
    pub options: u8,
    /// Numeric parameter slots.
    pub params: Params,
    /// Issuing unit, when the packet carries one.
    pub unit_id: Option<u32>,
}

impl RawCommand {
    /// Create a command with no issuing unit.
    pub fn new(command_id: i32, options: u8, params: &[f64]) -> Self {
        Self {
            command_id,
            options,
            params: SmallVec::from_slice(params),
            unit_id: None,
        }
    }

    /// Attach the issuing unit.
    pub fn with_unit(mut self, unit_id: u32) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    /// The resolved command type.
    pub fn command_type(&self) -> CommandType {
        CommandType::from_id(self.command_id)
    }
}

/// A position or direction in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vec3 {
    /// X (east-west).
    pub x: f64,
    /// Y (height).
    pub y: f64,
    /// Z (north-south).
    pub z: f64,
}

impl Vec3 {
    /// Read three consecutive slots. The caller guarantees the length.
    pub(crate) fn from_slots(slots: &[f64]) -> Self {
        Self {
            x: slots[0],
            y: slots[1],
            z: slots[2],
        }
    }
}

/// Per-shape command payload.
///
/// Serialized untagged, so a position renders as `{"x":..,"y":..,"z":..}`
/// and an empty payload as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandData {
    /// No payload: the command takes no parameters, no decoder is
    /// registered, or the parameters did not fit the shape.
    #[default]
    None,
    /// A map position.
    Position {
        /// X.
        x: f64,
        /// Y.
        y: f64,
        /// Z.
        z: f64,
    },
    /// Build placement.
    Build {
        /// X.
        x: f64,
        /// Y.
        y: f64,
        /// Z.
        z: f64,
        /// Facing (0..=3).
        direction: f64,
    },
    /// A circular area.
    Area {
        /// X.
        x: f64,
        /// Y.
        y: f64,
        /// Z.
        z: f64,
        /// Radius in elmos.
        radius: f64,
    },
    /// An integer mode.
    Mode {
        /// Mode value.
        mode: i32,
    },
    /// A target unit (or feature).
    Unit {
        /// Target id.
        unit_id: u32,
    },
    /// A generic numeric argument.
    Number {
        /// The argument.
        value: f64,
    },
    /// Formation move: camera-traced position plus direction.
    Front {
        /// Trace position.
        position: Vec3,
        /// Trace direction.
        direction: Vec3,
    },
    /// A rectangle given by two corners.
    Rectangle {
        /// First corner.
        start: Vec3,
        /// Opposite corner.
        end: Vec3,
    },
    /// REMOVE / INSERT: a queue position and the command it refers to.
    QueueEdit {
        /// Queue position.
        queue_pos: i32,
        /// The nested command.
        command: Box<DecodedCommand>,
    },
}

impl CommandData {
    /// Whether there is no payload.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// A decoded unit command.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DecodedCommand {
    /// Wire command id.
    pub command_id: i32,
    /// Engine name (`"BUILD"` for negative ids, `"UNKNOWN"` for ids
    /// outside the built-in table).
    pub name: String,
    /// Issuing unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<u32>,
    /// Unit definition being built. Build commands only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_def_id: Option<String>,
    /// Option flags.
    pub options: CommandOptions,
    /// Wire parameters, always retained.
    pub raw_params: Vec<f64>,
    /// Shape-specific payload.
    pub data: CommandData,
}

impl DecodedCommand {
    /// The resolved command type.
    pub fn command_type(&self) -> CommandType {
        CommandType::from_id(self.command_id)
    }
}

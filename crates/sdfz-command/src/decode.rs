//! Shape dispatch and nested decoding.
//!
//! Every command type maps to a [`ParamShape`]; every flat shape maps to a
//! decoder function in [`shape_decoder`]. A decoder returns `None` when the
//! parameter array does not fit the shape, which the caller reports once
//! per command type and turns into [`CommandData::None`].
//!
//! REMOVE and INSERT wrap another command. The chain of wrappers is
//! unwound in a loop and rebuilt from the innermost command outwards, so
//! nesting depth is bounded only by the parameter count and never by the
//! thread's stack.

use std::collections::HashSet;

use crate::command::{CommandData, DecodedCommand, RawCommand, Vec3};
use crate::command_type::{CommandType, ParamShape};
use crate::options::CommandOptions;
use crate::unit_defs::UnitDefTable;

/// Signature shared by all shape decoders.
type ShapeDecoder = fn(&mut CommandDecoder<'_>, &[f64], Option<u32>) -> Option<CommandData>;

/// Decoder for a parameter shape, or `None` when no decoder is registered.
fn shape_decoder(shape: ParamShape) -> Option<ShapeDecoder> {
    match shape {
        ParamShape::Icon => Some(decode_icon),
        ParamShape::Build => Some(decode_build),
        ParamShape::Mode => Some(decode_mode),
        ParamShape::Map | ParamShape::Building => Some(decode_position),
        ParamShape::Area => Some(decode_area),
        ParamShape::Unit => Some(decode_unit),
        ParamShape::UnitOrMap => Some(decode_unit_or_map),
        ParamShape::Front => Some(decode_front),
        ParamShape::UnitOrArea | ParamShape::UnitFeatureOrArea => Some(decode_unit_or_area),
        ParamShape::UnitOrRectangle => Some(decode_unit_or_rectangle),
        ParamShape::Number => Some(decode_number),
        // Queue edits long enough to wrap a command never get here.
        ParamShape::QueueEdit | ParamShape::Unregistered => None,
    }
}

/// Decodes raw commands against a unit definition table.
///
/// Holds the set of command types already reported as unresolved so each
/// one is logged a single time per decoder. One decoder is normally used
/// for a whole replay.
///
/// # Examples
///
/// ```
/// use sdfz_command::{CommandData, CommandDecoder, RawCommand, UnitDefTable};
///
/// let table = UnitDefTable::new();
/// let mut decoder = CommandDecoder::new(&table);
///
/// let by_unit = decoder.decode(&RawCommand::new(20, 0, &[42.0]));
/// assert_eq!(by_unit.data, CommandData::Unit { unit_id: 42 });
///
/// let by_pos = decoder.decode(&RawCommand::new(20, 0, &[1.0, 2.0, 3.0]));
/// assert_eq!(by_pos.data, CommandData::Position { x: 1.0, y: 2.0, z: 3.0 });
/// ```
pub struct CommandDecoder<'a> {
    unit_defs: &'a UnitDefTable,
    reported: HashSet<CommandType>,
    unresolved: u64,
}

impl<'a> CommandDecoder<'a> {
    /// Create a decoder over a unit definition table.
    pub fn new(unit_defs: &'a UnitDefTable) -> Self {
        Self {
            unit_defs,
            reported: HashSet::new(),
            unresolved: 0,
        }
    }

    /// Decode one command. Never fails.
    pub fn decode(&mut self, raw: &RawCommand) -> DecodedCommand {
        self.decode_parts(raw.command_id, raw.options, &raw.params, raw.unit_id)
    }

    /// Number of commands (nested ones included) whose payload could not
    /// be resolved so far.
    pub fn unresolved_count(&self) -> u64 {
        self.unresolved
    }

    fn decode_parts(
        &mut self,
        command_id: i32,
        options: u8,
        params: &[f64],
        unit_id: Option<u32>,
    ) -> DecodedCommand {
        // [queue_pos, id, options, params...]; each wrapper takes three slots.
        let mut wrappers = Vec::new();
        let (mut id, mut opts, mut rest) = (command_id, options, params);
        while let (ParamShape::QueueEdit, [queue_pos, inner_id, inner_opts, tail @ ..]) =
            (CommandType::from_id(id).shape(), rest)
        {
            wrappers.push((*queue_pos as i32, id, opts, rest));
            id = *inner_id as i32;
            opts = *inner_opts as u8;
            rest = tail;
        }

        let command_type = CommandType::from_id(id);
        let shape = command_type.shape();
        let data = shape_decoder(shape)
            .and_then(|decode| decode(self, rest, unit_id))
            .unwrap_or_else(|| {
                self.report_unresolved(command_type, shape, rest.len());
                CommandData::None
            });
        let mut command = self.assemble(id, opts, rest, unit_id, data);

        while let Some((queue_pos, id, opts, params)) = wrappers.pop() {
            let data = CommandData::QueueEdit {
                queue_pos,
                command: Box::new(command),
            };
            command = self.assemble(id, opts, params, unit_id, data);
        }
        command
    }

    fn assemble(
        &self,
        command_id: i32,
        options: u8,
        params: &[f64],
        unit_id: Option<u32>,
        data: CommandData,
    ) -> DecodedCommand {
        let command_type = CommandType::from_id(command_id);
        let unit_def_id = match command_type {
            CommandType::Build => Some(self.unit_defs.resolve(command_id)),
            _ => None,
        };
        DecodedCommand {
            command_id,
            name: command_type.name().to_owned(),
            unit_id,
            unit_def_id,
            options: CommandOptions::from_bits(options),
            raw_params: params.to_vec(),
            data,
        }
    }

    fn report_unresolved(&mut self, command_type: CommandType, shape: ParamShape, arity: usize) {
        self.unresolved += 1;
        if self.reported.insert(command_type) {
            tracing::warn!(
                command = %command_type,
                ?shape,
                arity,
                "unresolved command shape, keeping raw params"
            );
        }
    }
}

/// Decode a single command with a throwaway [`CommandDecoder`].
pub fn decode_command(raw: &RawCommand, unit_defs: &UnitDefTable) -> DecodedCommand {
    CommandDecoder::new(unit_defs).decode(raw)
}

// ── Shape decoders ──────────────────────────────────────────────

fn decode_icon(_: &mut CommandDecoder<'_>, _: &[f64], _: Option<u32>) -> Option<CommandData> {
    Some(CommandData::None)
}

fn decode_build(_: &mut CommandDecoder<'_>, params: &[f64], _: Option<u32>) -> Option<CommandData> {
    match params {
        [x, y, z, direction, ..] => Some(CommandData::Build {
            x: *x,
            y: *y,
            z: *z,
            direction: *direction,
        }),
        _ => None,
    }
}

fn decode_mode(_: &mut CommandDecoder<'_>, params: &[f64], _: Option<u32>) -> Option<CommandData> {
    params.first().map(|&mode| CommandData::Mode { mode: mode as i32 })
}

fn decode_position(
    _: &mut CommandDecoder<'_>,
    params: &[f64],
    _: Option<u32>,
) -> Option<CommandData> {
    position(params)
}

fn decode_area(_: &mut CommandDecoder<'_>, params: &[f64], _: Option<u32>) -> Option<CommandData> {
    area(params)
}

fn decode_unit(_: &mut CommandDecoder<'_>, params: &[f64], _: Option<u32>) -> Option<CommandData> {
    params.first().map(|&id| unit(id))
}

fn decode_unit_or_map(
    _: &mut CommandDecoder<'_>,
    params: &[f64],
    _: Option<u32>,
) -> Option<CommandData> {
    match params.len() {
        1 => Some(unit(params[0])),
        n if n >= 3 => position(params),
        _ => None,
    }
}

fn decode_front(_: &mut CommandDecoder<'_>, params: &[f64], _: Option<u32>) -> Option<CommandData> {
    match params.len() {
        n if n >= 6 => Some(CommandData::Front {
            position: Vec3::from_slots(&params[0..3]),
            direction: Vec3::from_slots(&params[3..6]),
        }),
        n if n >= 3 => position(params),
        _ => None,
    }
}

fn decode_unit_or_area(
    _: &mut CommandDecoder<'_>,
    params: &[f64],
    _: Option<u32>,
) -> Option<CommandData> {
    match params.len() {
        1 => Some(unit(params[0])),
        _ => area(params),
    }
}

fn decode_unit_or_rectangle(
    _: &mut CommandDecoder<'_>,
    params: &[f64],
    _: Option<u32>,
) -> Option<CommandData> {
    match params.len() {
        1 => Some(unit(params[0])),
        n if n >= 6 => Some(CommandData::Rectangle {
            start: Vec3::from_slots(&params[0..3]),
            end: Vec3::from_slots(&params[3..6]),
        }),
        _ => None,
    }
}

fn decode_number(_: &mut CommandDecoder<'_>, params: &[f64], _: Option<u32>) -> Option<CommandData> {
    params.first().map(|&value| CommandData::Number { value })
}

fn position(params: &[f64]) -> Option<CommandData> {
    match params {
        [x, y, z, ..] => Some(CommandData::Position {
            x: *x,
            y: *y,
            z: *z,
        }),
        _ => None,
    }
}

fn area(params: &[f64]) -> Option<CommandData> {
    match params {
        [x, y, z, radius, ..] => Some(CommandData::Area {
            x: *x,
            y: *y,
            z: *z,
            radius: *radius,
        }),
        _ => None,
    }
}

// Float slots carry integer ids; `as` saturates and maps NaN to 0.
fn unit(slot: f64) -> CommandData {
    CommandData::Unit {
        unit_id: slot as u32,
    }
}

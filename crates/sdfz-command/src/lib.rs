//! Structural decoding of Spring engine unit commands.
//!
//! This is the leaf crate of the sdfz workspace. It turns the wire form of
//! a unit order (a command id, an option bitmask and a flat array of numeric
//! parameters) into a typed [`DecodedCommand`]. There is no I/O and no
//! gameplay interpretation here: the decoder only maps wire slots to the
//! parameter record implied by the command's parameter shape.
//!
//! # Architecture
//!
//! - [`CommandType`] resolves a command id to its engine name and [`ParamShape`]
//! - [`CommandOptions`] decodes the option bitmask from a fixed bit table
//! - [`CommandDecoder`] dispatches on the shape and decodes REMOVE / INSERT
//!   commands that carry a nested command, to any depth
//! - [`UnitDefTable`] resolves build commands to unit definition names
//!
//! Decoding is total: unknown ids and short parameter arrays degrade to
//! [`CommandData::None`] with the raw parameters retained.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod command;
pub mod command_type;
pub mod decode;
pub mod options;
pub mod unit_defs;

pub use command::{CommandData, DecodedCommand, RawCommand, Vec3};
pub use command_type::{CommandType, ParamShape};
pub use decode::{decode_command, CommandDecoder};
pub use options::CommandOptions;
pub use unit_defs::UnitDefTable;

//! Reader for Spring engine demo (replay) files.
//!
//! A demo is a binary container written by the engine while a match runs.
//! It carries the launch script the match was started with, every network
//! packet the host relayed, and (once the match ends cleanly) a statistics
//! footer. This crate decodes that container into a [`ReplayRecord`] plus
//! the decoded unit command stream.
//!
//! # Architecture
//!
//! - [`DemoReader`] reads the header, script and stream chunks from any `Read` source
//! - [`parse`] / [`parse_file`] drive a reader to completion and build a [`Demo`]
//! - [`decode_packet`] turns one stream chunk into a typed [`Packet`]
//! - [`parse_script`] parses the launch script's `[section] { key=value; }` grammar
//! - Unit commands are decoded with [`sdfz_command`]
//!
//! # Format
//!
//! ```text
//! [gzip (optional)]
//!   [MAGIC "spring demofile\0"] [VERSION i32] [HEADER_SIZE i32] [header fields ...]
//!   [launch script]
//!   [Chunk 1] [Chunk 2] ... [Chunk N]      chunk = game_time f32, length u32, packet
//!   [footer: winning ally teams, player stats, team stats]   (finalized demos only)
//! ```
//!
//! A demo whose header declares no stream size was never finalized: the
//! engine crashed or is still writing. Such demos are read up to the last
//! complete chunk and report `ended_normally == false`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod packet;
pub mod reader;
pub mod roster;
pub mod script;
pub mod types;

pub use codec::DemoChunk;
pub use error::DemoError;
pub use packet::{decode_packet, Packet};
pub use reader::{
    parse, parse_container, parse_file, read_replay_record, ChunkIter, Demo, DemoReader,
    ParseOptions,
};
pub use roster::Roster;
pub use script::{parse_script, ScriptSection};
pub use types::{
    Ai, AllyTeam, ChatMessage, ChatRecipient, Contender, DemoFooter, DemoHeader, GameId,
    InvalidGameId, PacketStats, Player, PlayerStatistics, ReplayHeader, ReplayRecord, Settings,
    Spectator, StartBox, StartPosition, TimedCommand,
};

/// Magic bytes at the start of every demo file.
pub const MAGIC: [u8; 16] = *b"spring demofile\0";

/// Header versions this reader understands.
pub const SUPPORTED_VERSIONS: [u32; 2] = [4, 5];

/// First two bytes of a gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Largest packet a stream chunk may carry.
pub const MAX_PACKET_LEN: u32 = 1 << 20;

/// Largest launch script accepted.
pub const MAX_SCRIPT_LEN: u32 = 16 << 20;

/// Largest player slot count a header may declare.
pub const MAX_PLAYERS: u32 = 1024;

/// Largest size accepted for each footer block (winners, player and team
/// statistics).
pub const MAX_FOOTER_BLOCK_LEN: u32 = 16 << 20;

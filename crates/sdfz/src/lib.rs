//! Spring engine demo reader and replay cache.
//!
//! This is the facade crate: it re-exports the public API of the `sdfz-*`
//! crates. The `sdfz` binary built from this crate inspects single demos
//! and drives the cache from the command line.
//!
//! # Quick start
//!
//! ```no_run
//! use sdfz::prelude::*;
//!
//! let demo = parse_file("demos/2024-05-01_12-00-00_isthmus.sdfz", &ParseOptions::default())?;
//! println!("{} on {}", demo.record.game_version, demo.record.map_spring_name);
//! for timed in demo.commands.iter().flatten() {
//!     println!("{:>8} ms  {}", timed.game_time_ms, timed.command.name);
//! }
//! # Ok::<(), sdfz::demo::DemoError>(())
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`command`] | `sdfz-command` | Unit command decoding and the command id table |
//! | [`demo`] | `sdfz-demo` | Demo container, packets, launch script, replay records |
//! | [`cache`] | `sdfz-cache` | SQLite replay cache, ingestion pipeline, directory watcher |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Unit command decoding (`sdfz-command`).
///
/// [`command::CommandDecoder`] turns a raw id, option byte and parameter
/// list into a [`command::DecodedCommand`].
pub use sdfz_command as command;

/// Demo file reading (`sdfz-demo`).
///
/// [`demo::parse_file`] reads a whole demo; [`demo::DemoReader`] streams
/// its chunks.
pub use sdfz_demo as demo;

/// The replay cache (`sdfz-cache`).
///
/// [`cache::ReplayCache`] runs the ingestion worker; [`cache::ReplayStore`]
/// is the SQLite layer underneath.
pub use sdfz_cache as cache;

/// Common imports.
///
/// ```rust
/// use sdfz::prelude::*;
/// ```
pub mod prelude {
    // Commands
    pub use sdfz_command::{
        CommandData, CommandDecoder, CommandOptions, CommandType, DecodedCommand, RawCommand,
        UnitDefTable,
    };

    // Demos
    pub use sdfz_demo::{
        parse, parse_file, read_replay_record, Contender, Demo, DemoError, DemoReader, GameId,
        ParseOptions, ReplayRecord, TimedCommand,
    };

    // Cache
    pub use sdfz_cache::{
        CacheConfig, CacheError, CacheEvent, FileUseProbe, Ingestor, MapProvider, ReplayCache,
        ReplayStore, StoreError,
    };
}

//! Test fixtures for sdfz development.
//!
//! Provides a [`DemoBuilder`] that writes byte-exact demo files (raw or
//! gzipped), packet encoders in [`packets`] and a [`ScriptBuilder`] for
//! launch scripts. Nothing here depends on the reader crates, so every
//! crate in the workspace can use these fixtures in its tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod packets;
pub mod script;

use std::io::{self, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

pub use script::ScriptBuilder;

/// Bytes of the header fields a version 5 demo carries.
pub const HEADER_LEN_V5: usize = 360;
/// Bytes of the header fields a version 4 demo carries.
pub const HEADER_LEN_V4: usize = 120;

/// Builder for demo files.
///
/// Defaults to a finalized version 5 demo with a non-zero game id, an
/// empty script and no chunks.
#[derive(Clone, Debug)]
pub struct DemoBuilder {
    version: i32,
    engine_version: String,
    game_id: [u8; 16],
    unix_time: u64,
    script: String,
    chunks: Vec<(f32, Vec<u8>)>,
    finalized: bool,
    game_time: u64,
    wallclock_time: u64,
    winning_ally_teams: Vec<u8>,
    player_stats: Vec<[i32; 5]>,
    player_stat_elem_size: usize,
    team_stats: Vec<u8>,
    header_padding: usize,
    gzip: bool,
}

impl DemoBuilder {
    pub fn new() -> Self {
        let mut game_id = [0u8; 16];
        for (i, b) in game_id.iter_mut().enumerate() {
            *b = 0xa0 + i as u8;
        }
        Self {
            version: 5,
            engine_version: "105.1.1-2511-g747f18b BAR105".into(),
            game_id,
            unix_time: 1_700_000_000,
            script: String::new(),
            chunks: Vec::new(),
            finalized: true,
            game_time: 0,
            wallclock_time: 0,
            winning_ally_teams: Vec::new(),
            player_stats: Vec::new(),
            player_stat_elem_size: 20,
            team_stats: Vec::new(),
            header_padding: 0,
            gzip: false,
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn engine_version(mut self, engine_version: impl Into<String>) -> Self {
        self.engine_version = engine_version.into();
        self
    }

    pub fn game_id(mut self, game_id: [u8; 16]) -> Self {
        self.game_id = game_id;
        self
    }

    pub fn unix_time(mut self, unix_time: u64) -> Self {
        self.unix_time = unix_time;
        self
    }

    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }

    /// In-game duration in seconds, written when finalized.
    pub fn game_time(mut self, seconds: u64) -> Self {
        self.game_time = seconds;
        self
    }

    pub fn wallclock_time(mut self, seconds: u64) -> Self {
        self.wallclock_time = seconds;
        self
    }

    /// Write the demo as the engine leaves it mid-match: no stream size,
    /// no game time and no footer.
    pub fn unfinalized(mut self) -> Self {
        self.finalized = false;
        self
    }

    pub fn winners(mut self, ally_teams: &[u8]) -> Self {
        self.winning_ally_teams = ally_teams.to_vec();
        self
    }

    /// Footer statistics, one entry per player slot:
    /// mouse pixels, clicks, key presses, commands, unit commands.
    pub fn player_stats(mut self, stats: Vec<[i32; 5]>) -> Self {
        self.player_stats = stats;
        self
    }

    /// Length of each player statistics element. Bytes beyond the five
    /// fields are zero-filled.
    pub fn player_stat_elem_size(mut self, size: usize) -> Self {
        self.player_stat_elem_size = size;
        self
    }

    /// Opaque team statistics bytes.
    pub fn team_stats(mut self, bytes: Vec<u8>) -> Self {
        self.team_stats = bytes;
        self
    }

    /// Extra header bytes after the known fields.
    pub fn header_padding(mut self, bytes: usize) -> Self {
        self.header_padding = bytes;
        self
    }

    pub fn gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Append a raw chunk.
    pub fn chunk(mut self, game_time: f32, packet: Vec<u8>) -> Self {
        self.chunks.push((game_time, packet));
        self
    }

    pub fn command(
        self,
        game_time: f32,
        player: u8,
        command_id: i32,
        options: u8,
        params: &[f32],
    ) -> Self {
        self.chunk(game_time, packets::command(player, command_id, options, params))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn ai_command(
        self,
        game_time: f32,
        player: u8,
        ai: u8,
        unit: u16,
        command_id: i32,
        options: u8,
        params: &[f32],
    ) -> Self {
        self.chunk(
            game_time,
            packets::ai_command(player, ai, unit, command_id, options, params),
        )
    }

    pub fn chat(self, game_time: f32, from: u8, dest: u8, text: &str) -> Self {
        self.chunk(game_time, packets::chat(from, dest, text))
    }

    pub fn start_playing(self, game_time: f32, countdown: u32) -> Self {
        self.chunk(game_time, packets::start_playing(countdown))
    }

    pub fn game_over(self, game_time: f32, player: u8, winners: &[u8]) -> Self {
        self.chunk(game_time, packets::game_over(player, winners))
    }

    pub fn player_left(self, game_time: f32, player: u8, reason: u8) -> Self {
        self.chunk(game_time, packets::player_left(player, reason))
    }

    fn stream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (time, packet) in &self.chunks {
            out.extend_from_slice(&time.to_le_bytes());
            out.extend_from_slice(&(packet.len() as u32).to_le_bytes());
            out.extend_from_slice(packet);
        }
        out
    }

    /// The uncompressed file contents.
    pub fn raw_bytes(&self) -> Vec<u8> {
        let stream = self.stream();
        let (version_len, known) = if self.version == 4 {
            (16, HEADER_LEN_V4)
        } else {
            (256, HEADER_LEN_V5)
        };
        let script_size = if self.script.is_empty() {
            0
        } else {
            self.script.len() + 1
        };
        let elem = self.player_stat_elem_size;

        let mut out = Vec::new();
        out.extend_from_slice(b"spring demofile\0");
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&((known + self.header_padding) as i32).to_le_bytes());
        let mut engine = self.engine_version.as_bytes().to_vec();
        engine.resize(version_len, 0);
        out.extend_from_slice(&engine);
        out.extend_from_slice(&self.game_id);
        out.extend_from_slice(&self.unix_time.to_le_bytes());
        out.extend_from_slice(&(script_size as i32).to_le_bytes());
        let stream_size = if self.finalized { stream.len() } else { 0 };
        out.extend_from_slice(&(stream_size as i32).to_le_bytes());
        let game_time = if self.finalized { self.game_time } else { 0 };
        out.extend_from_slice(&game_time.to_le_bytes());
        out.extend_from_slice(&self.wallclock_time.to_le_bytes());
        for size in [
            self.player_stats.len(),
            self.player_stats.len() * elem,
            elem,
            0,
            self.team_stats.len(),
            0,
            0,
            self.winning_ally_teams.len(),
        ] {
            out.extend_from_slice(&(size as i32).to_le_bytes());
        }
        out.resize(out.len() + self.header_padding, 0);

        if script_size > 0 {
            out.extend_from_slice(self.script.as_bytes());
            out.push(0);
        }
        out.extend_from_slice(&stream);

        if self.finalized {
            out.extend_from_slice(&self.winning_ally_teams);
            for stats in &self.player_stats {
                let mut element = Vec::with_capacity(elem);
                for v in stats {
                    element.extend_from_slice(&v.to_le_bytes());
                }
                element.resize(elem, 0);
                out.extend_from_slice(&element);
            }
            out.extend_from_slice(&self.team_stats);
        }
        out
    }

    /// The file contents, gzipped when requested.
    pub fn build(&self) -> Vec<u8> {
        let raw = self.raw_bytes();
        if !self.gzip {
            return raw;
        }
        gzip(&raw)
    }

    /// Write [`build`](Self::build) to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.build())
    }
}

impl Default for DemoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Gzip `bytes` in memory.
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // Writing to a Vec cannot fail.
    let _ = encoder.write_all(bytes);
    encoder.finish().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_has_declared_size() {
        let bytes = DemoBuilder::new().raw_bytes();
        assert_eq!(&bytes[..16], b"spring demofile\0");
        let declared = i32::from_le_bytes(bytes[20..24].try_into().unwrap());
        assert_eq!(declared as usize, HEADER_LEN_V5);
        assert_eq!(bytes.len(), HEADER_LEN_V5);
    }

    #[test]
    fn v4_header_is_shorter() {
        let bytes = DemoBuilder::new().version(4).raw_bytes();
        assert_eq!(bytes.len(), HEADER_LEN_V4);
    }

    #[test]
    fn gzip_starts_with_magic() {
        let bytes = DemoBuilder::new().gzip(true).build();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn stream_size_tracks_chunks() {
        let bytes = DemoBuilder::new().chunk(1.0, vec![1, 2, 3]).raw_bytes();
        let offset = 16 + 4 + 4 + 256 + 16 + 8 + 4;
        let stream = i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
        assert_eq!(stream, 11);
    }
}

//! Demo reader and whole-file parse.
//!
//! [`DemoReader`] reads chunks from any `Read` source, decoding the
//! container framing. The header and launch script are read on
//! construction; the footer is read by [`DemoReader::finish`].
//! [`parse`] drives a reader to completion and builds a [`Demo`].

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Take};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::bufread::GzDecoder;
use sdfz_command::{CommandDecoder, UnitDefTable};
use serde::Serialize;
use tracing::debug;

use crate::codec::{decode_chunk, decode_footer, decode_header, decode_script, DemoChunk};
use crate::error::DemoError;
use crate::packet::{decode_packet, Packet};
use crate::roster::Roster;
use crate::script::{parse_script, ScriptSection};
use crate::types::{
    ChatMessage, DemoFooter, DemoHeader, PacketStats, ReplayHeader, ReplayRecord, Settings,
    TimedCommand,
};
use crate::GZIP_MAGIC;

/// Reads demo data from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production
/// code can use a gzip decoder over a file.
///
/// For a finalized demo the stream is bounded by the header's declared
/// size: ending early is [`DemoError::Incomplete`] and a chunk crossing
/// the boundary is [`DemoError::Corrupt`]. An unfinalized demo is read
/// until the data runs out; a trailing partial chunk is dropped.
pub struct DemoReader<R: Read> {
    reader: Take<R>,
    header: DemoHeader,
    script: String,
    chunks_read: u64,
    last_game_time: f32,
    done: bool,
}

impl<R: Read> DemoReader<R> {
    /// Open a demo stream, reading and validating the header and script.
    pub fn open(mut reader: R) -> Result<Self, DemoError> {
        let header = decode_header(&mut reader)?;
        let script = decode_script(&mut reader, header.script_size)?;
        let limit = if header.is_finalized() {
            u64::from(header.demo_stream_size)
        } else {
            u64::MAX
        };
        Ok(Self {
            reader: reader.take(limit),
            header,
            script,
            chunks_read: 0,
            last_game_time: 0.0,
            done: false,
        })
    }

    /// The fixed header.
    pub fn header(&self) -> &DemoHeader {
        &self.header
    }

    /// The launch script text.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Number of chunks read so far.
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Game time of the last chunk read, in seconds.
    pub fn last_game_time(&self) -> f32 {
        self.last_game_time
    }

    /// Read the next chunk, or `None` at the end of the stream.
    pub fn next_chunk(&mut self) -> Result<Option<DemoChunk>, DemoError> {
        if self.done {
            return Ok(None);
        }
        let finalized = self.header.is_finalized();
        match decode_chunk(&mut self.reader) {
            Ok(Some(chunk)) => {
                self.chunks_read += 1;
                self.last_game_time = chunk.game_time;
                Ok(Some(chunk))
            }
            Ok(None) => {
                self.done = true;
                let missing = self.reader.limit();
                if finalized && missing > 0 {
                    return Err(DemoError::incomplete(format!(
                        "stream ended {missing} bytes before its declared size"
                    )));
                }
                Ok(None)
            }
            Err(e) if e.is_incomplete() && finalized && self.reader.limit() == 0 => {
                self.done = true;
                Err(DemoError::corrupt(format!(
                    "chunk {} overruns the declared stream size",
                    self.chunks_read + 1
                )))
            }
            Err(e) if e.is_incomplete() && !finalized => {
                self.done = true;
                debug!(
                    chunks = self.chunks_read,
                    error = %e,
                    "discarding partial trailing chunk of unfinalized demo"
                );
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// Iterate over the remaining chunks.
    pub fn chunks(&mut self) -> ChunkIter<'_, R> {
        ChunkIter { reader: self }
    }

    /// Drain any unread chunks and read the footer.
    ///
    /// Returns `None` for an unfinalized demo, which has no footer.
    pub fn finish(mut self) -> Result<Option<DemoFooter>, DemoError> {
        while self.next_chunk()?.is_some() {}
        if !self.header.is_finalized() {
            return Ok(None);
        }
        let mut inner = self.reader.into_inner();
        decode_footer(&mut inner, &self.header).map(Some)
    }
}

/// Iterator adapter over demo chunks.
pub struct ChunkIter<'r, R: Read> {
    reader: &'r mut DemoReader<R>,
}

impl<R: Read> Iterator for ChunkIter<'_, R> {
    type Item = Result<DemoChunk, DemoError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_chunk().transpose()
    }
}

// ── Whole-file parse ────────────────────────────────────────────

/// Controls what a parse keeps.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Names for build commands.
    pub unit_defs: UnitDefTable,
    /// Decode and keep every unit command.
    pub decode_commands: bool,
    /// Keep the chat log in the record.
    pub chatlog: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            unit_defs: UnitDefTable::new(),
            decode_commands: true,
            chatlog: true,
        }
    }
}

impl ParseOptions {
    /// Options for building a [`ReplayRecord`] only: commands are counted
    /// but not decoded.
    pub fn record_only() -> Self {
        Self {
            decode_commands: false,
            ..Self::default()
        }
    }
}

/// A fully parsed demo.
#[derive(Clone, Debug, Serialize)]
pub struct Demo {
    /// Header summary.
    pub header: ReplayHeader,
    /// The persisted record.
    pub record: ReplayRecord,
    /// Decoded unit commands, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<TimedCommand>>,
    /// Packet counts.
    pub packet_stats: PacketStats,
    /// Commands whose parameters did not fit any known shape.
    pub unresolved_commands: u64,
}

impl Demo {
    /// The record, rejecting demos without a game id.
    pub fn validated_record(self) -> Result<ReplayRecord, DemoError> {
        if self.record.game_id.is_sentinel() {
            return Err(DemoError::SentinelGameId);
        }
        Ok(self.record)
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    // `as` saturates; NaN and negatives land on zero.
    (seconds * 1000.0).round() as u64
}

fn settings(section: Option<&ScriptSection>) -> Settings {
    section.map(|s| s.values().clone()).unwrap_or_default()
}

/// Parse an uncompressed demo stream.
///
/// `file_name` is stored in the record and used in log lines. The demo is
/// returned even when its game id is the all-zero sentinel; use
/// [`Demo::validated_record`] to reject those.
pub fn parse<R: Read>(
    reader: R,
    file_name: &str,
    options: &ParseOptions,
) -> Result<Demo, DemoError> {
    let mut reader = DemoReader::open(reader)?;
    let root = parse_script(reader.script())?;

    let mut decoder = CommandDecoder::new(&options.unit_defs);
    let mut stats = PacketStats::default();
    let mut commands = options.decode_commands.then(Vec::new);
    let mut chatlog = options.chatlog.then(Vec::new);

    while let Some(chunk) = reader.next_chunk()? {
        stats.total += 1;
        let game_time_ms = seconds_to_ms(f64::from(chunk.game_time));
        let packet = match decode_packet(&chunk.packet) {
            Ok(packet) => packet,
            Err(e) => {
                stats.malformed += 1;
                debug!(file = %file_name, game_time_ms, error = %e, "skipping malformed packet");
                continue;
            }
        };
        match packet {
            Packet::Command { player_id, command } => {
                stats.commands += 1;
                if let Some(out) = commands.as_mut() {
                    out.push(TimedCommand {
                        game_time_ms,
                        player_id,
                        ai_id: None,
                        command: decoder.decode(&command),
                    });
                }
            }
            Packet::AiCommand {
                player_id,
                ai_id,
                command,
            } => {
                stats.ai_commands += 1;
                if let Some(out) = commands.as_mut() {
                    out.push(TimedCommand {
                        game_time_ms,
                        player_id,
                        ai_id: Some(ai_id),
                        command: decoder.decode(&command),
                    });
                }
            }
            Packet::Chat {
                from,
                recipient,
                message,
            } => {
                stats.chats += 1;
                if let Some(log) = chatlog.as_mut() {
                    log.push(ChatMessage {
                        game_time_ms,
                        from_player_id: from,
                        recipient,
                        message,
                    });
                }
            }
            Packet::StartPlaying { .. } => stats.start_playing += 1,
            Packet::GameOver { .. } => stats.game_over += 1,
            Packet::PlayerLeft { .. } => stats.player_left += 1,
            Packet::LuaMsg { .. } => stats.lua_messages += 1,
            Packet::Other { .. } => stats.other += 1,
        }
    }

    let last_game_time = reader.last_game_time();
    let script = reader.script().to_owned();
    let header = reader.header().clone();
    let footer = reader.finish()?;

    let ended_normally = header.is_finalized();
    let duration_ms = if ended_normally {
        header.game_time.saturating_mul(1000)
    } else {
        seconds_to_ms(f64::from(last_game_time))
    };
    let start_time = i64::try_from(header.unix_time)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or_else(|| {
            DemoError::corrupt(format!("start time {} out of range", header.unix_time))
        })?;

    let game = root.section("game");
    let roster = Roster::from_script(&root, footer.as_ref());
    let record = ReplayRecord {
        file_name: file_name.to_owned(),
        game_id: header.game_id,
        engine_version: header.engine_version.clone(),
        game_version: game
            .and_then(|g| g.get("gametype"))
            .unwrap_or_default()
            .to_owned(),
        map_spring_name: game
            .and_then(|g| g.get("mapname"))
            .unwrap_or_default()
            .to_owned(),
        start_time,
        duration_ms,
        ended_normally,
        teams: roster.teams,
        contenders: roster.contenders,
        spectators: roster.spectators,
        chatlog,
        script,
        battle_settings: settings(game),
        game_settings: settings(root.section_path(&["game", "modoptions"])),
        map_settings: settings(root.section_path(&["game", "mapoptions"])),
        host_settings: settings(root.section_path(&["game", "hostoptions"])),
    };

    debug!(
        file = %file_name,
        game_id = %header.game_id,
        chunks = stats.total,
        malformed = stats.malformed,
        duration_ms,
        ended_normally,
        "parsed demo"
    );

    Ok(Demo {
        header: ReplayHeader {
            engine_version: header.engine_version,
            game_version: record.game_version.clone(),
            map_spring_name: record.map_spring_name.clone(),
            game_id: header.game_id,
            start_time,
            duration_ms,
            ended_normally,
            header_version: header.version,
            header_size: header.header_size,
            script_size: header.script_size,
            demo_stream_size: header.demo_stream_size,
        },
        record,
        commands,
        packet_stats: stats,
        unresolved_commands: decoder.unresolved_count(),
    })
}

/// Parse a demo that may be gzip-compressed.
///
/// Streams starting with the gzip magic are decompressed; anything else
/// is read as-is.
pub fn parse_container<R: BufRead>(
    mut reader: R,
    file_name: &str,
    options: &ParseOptions,
) -> Result<Demo, DemoError> {
    let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
    if gzipped {
        parse(GzDecoder::new(reader), file_name, options)
    } else {
        parse(reader, file_name, options)
    }
}

/// Parse a demo file (`.sdfz` gzip or raw `.sdf`).
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Demo, DemoError> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = File::open(path)?;
    parse_container(BufReader::new(file), &file_name, options)
}

/// Read the persisted record of a demo file.
///
/// Commands are not decoded. Demos whose game id is the all-zero sentinel
/// are rejected with [`DemoError::SentinelGameId`].
pub fn read_replay_record(path: impl AsRef<Path>) -> Result<ReplayRecord, DemoError> {
    parse_file(path, &ParseOptions::record_only())?.validated_record()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdfz_test_utils::{DemoBuilder, ScriptBuilder};

    fn script() -> String {
        ScriptBuilder::new()
            .game("Tundra", "BAR test-1")
            .player(0, "Alice", 0)
            .team(0, 0, "Armada")
            .ally_team(0)
            .build()
    }

    #[test]
    fn reads_header_and_script() {
        let bytes = DemoBuilder::new().script(script()).build();
        let reader = DemoReader::open(bytes.as_slice()).unwrap();
        assert_eq!(reader.header().version, 5);
        assert!(reader.header().is_finalized());
        assert!(reader.script().contains("mapname=Tundra;"));
    }

    #[test]
    fn iterates_chunks() {
        let bytes = DemoBuilder::new()
            .script(script())
            .chunk(0.5, vec![2, 0])
            .chunk(1.0, vec![2, 1])
            .build();
        let mut reader = DemoReader::open(bytes.as_slice()).unwrap();
        let chunks: Vec<_> = reader.chunks().collect::<Result<_, _>>().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].game_time, 1.0);
        assert_eq!(reader.chunks_read(), 2);
        assert!(reader.finish().unwrap().is_some());
    }

    #[test]
    fn finalized_short_stream_is_incomplete() {
        let bytes = DemoBuilder::new()
            .script(script())
            .chunk(0.5, vec![2, 0, 0, 0])
            .build();
        let cut = &bytes[..bytes.len() - 2];
        let err = parse(cut, "cut.sdfz", &ParseOptions::default()).unwrap_err();
        assert!(err.is_incomplete(), "{err}");
    }

    #[test]
    fn unfinalized_partial_chunk_is_dropped() {
        let bytes = DemoBuilder::new()
            .script(script())
            .unfinalized()
            .chunk(1.0, vec![2, 0])
            .chunk(2.25, vec![2, 0, 0, 0, 0, 0])
            .build();
        let cut = &bytes[..bytes.len() - 3];
        let demo = parse(cut, "crash.sdfz", &ParseOptions::default()).unwrap();
        assert!(!demo.record.ended_normally);
        assert_eq!(demo.packet_stats.total, 1);
        assert_eq!(demo.record.duration_ms, 1000);
    }

    #[test]
    fn counts_packets_and_keeps_commands() {
        let bytes = DemoBuilder::new()
            .script(script())
            .start_playing(0.0, 0)
            .command(1.0, 0, 10, 0, &[10.0, 0.0, 20.0])
            .command(1.5, 0, -3, 32, &[64.0, 0.0, 64.0, 1.0])
            .chat(2.0, 0, 254, "gg")
            .chunk(2.5, vec![11, 0])
            .chunk(3.0, vec![99])
            .build();
        let options = ParseOptions {
            unit_defs: UnitDefTable::from_names(["a", "b", "armsolar"]),
            ..ParseOptions::default()
        };
        let demo = parse(bytes.as_slice(), "x.sdfz", &options).unwrap();
        assert_eq!(demo.packet_stats.total, 6);
        assert_eq!(demo.packet_stats.commands, 2);
        assert_eq!(demo.packet_stats.chats, 1);
        assert_eq!(demo.packet_stats.start_playing, 1);
        assert_eq!(demo.packet_stats.malformed, 1);
        assert_eq!(demo.packet_stats.other, 1);

        let commands = demo.commands.unwrap();
        assert_eq!(commands[0].command.name, "MOVE");
        assert_eq!(commands[0].game_time_ms, 1000);
        assert_eq!(commands[1].command.unit_def_id.as_deref(), Some("armsolar"));
        assert!(commands[1].command.options.shift_key);

        let chat = demo.record.chatlog.unwrap();
        assert_eq!(chat[0].message, "gg");
    }

    #[test]
    fn record_only_skips_commands() {
        let bytes = DemoBuilder::new()
            .script(script())
            .command(1.0, 0, 0, 0, &[])
            .build();
        let demo = parse(bytes.as_slice(), "x.sdfz", &ParseOptions::record_only()).unwrap();
        assert!(demo.commands.is_none());
        assert_eq!(demo.packet_stats.commands, 1);
    }

    #[test]
    fn settings_come_from_game_sections() {
        let text = ScriptBuilder::new()
            .game("Tundra", "BAR test-1")
            .mod_option("startmetal", "1000")
            .map_option("waterlevel", "0")
            .host_option("autostart", "1")
            .build();
        let bytes = DemoBuilder::new().script(text).build();
        let record = parse(bytes.as_slice(), "x.sdfz", &ParseOptions::default())
            .unwrap()
            .record;
        assert_eq!(record.map_spring_name, "Tundra");
        assert_eq!(record.game_version, "BAR test-1");
        assert_eq!(record.battle_settings["mapname"], "Tundra");
        assert_eq!(record.game_settings["startmetal"], "1000");
        assert_eq!(record.map_settings["waterlevel"], "0");
        assert_eq!(record.host_settings["autostart"], "1");
    }

    #[test]
    fn sentinel_parses_but_does_not_validate() {
        let bytes = DemoBuilder::new().script(script()).game_id([0; 16]).build();
        let demo = parse(bytes.as_slice(), "x.sdfz", &ParseOptions::default()).unwrap();
        assert!(demo.record.game_id.is_sentinel());
        assert!(matches!(
            demo.validated_record(),
            Err(DemoError::SentinelGameId)
        ));
    }

    #[test]
    fn gzip_is_detected() {
        let builder = DemoBuilder::new().script(script()).command(1.0, 0, 0, 0, &[]);
        let raw = parse_container(builder.build().as_slice(), "a.sdfz", &ParseOptions::default())
            .unwrap();
        let gz = parse_container(
            builder.gzip(true).build().as_slice(),
            "a.sdfz",
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(raw.record, gz.record);
    }

    #[test]
    fn duration_of_finalized_demo_uses_header() {
        let bytes = DemoBuilder::new()
            .script(script())
            .game_time(754)
            .chunk(3.0, vec![2])
            .build();
        let demo = parse(bytes.as_slice(), "x.sdfz", &ParseOptions::default()).unwrap();
        assert!(demo.record.ended_normally);
        assert_eq!(demo.record.duration_ms, 754_000);
    }
}

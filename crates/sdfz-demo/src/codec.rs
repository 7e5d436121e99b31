//! Binary decode for the demo container.
//!
//! All integers are little-endian. Sizes are stored as `i32` on the wire
//! and rejected when negative. Every read names the field it is reading so
//! that a short file reports which part was cut off.

use std::io::{self, Read};

use crate::error::DemoError;
use crate::types::{DemoFooter, DemoHeader, GameId, PlayerStatistics};
use crate::{MAGIC, MAX_FOOTER_BLOCK_LEN, MAX_PACKET_LEN, MAX_PLAYERS, MAX_SCRIPT_LEN};

// ── Primitive readers ───────────────────────────────────────────

/// Read exactly `N` bytes.
pub fn read_array<const N: usize>(r: &mut dyn Read, what: &str) -> Result<[u8; N], DemoError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)
        .map_err(|e| DemoError::from_read(e, what))?;
    Ok(buf)
}

/// Read exactly `len` bytes into a new buffer.
///
/// The buffer grows with the bytes actually read, so a size field larger
/// than the input costs no more than the input itself.
pub fn read_vec(r: &mut dyn Read, len: usize, what: &str) -> Result<Vec<u8>, DemoError> {
    let mut buf = Vec::new();
    r.take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| DemoError::from_read(e, what))?;
    if buf.len() < len {
        return Err(DemoError::incomplete(format!(
            "eof while reading {what}: got {} of {len} bytes",
            buf.len()
        )));
    }
    Ok(buf)
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read, what: &str) -> Result<i32, DemoError> {
    read_array(r, what).map(i32::from_le_bytes)
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read, what: &str) -> Result<u32, DemoError> {
    read_array(r, what).map(u32::from_le_bytes)
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read, what: &str) -> Result<u64, DemoError> {
    read_array(r, what).map(u64::from_le_bytes)
}

/// Read a little-endian f32.
pub fn read_f32_le(r: &mut dyn Read, what: &str) -> Result<f32, DemoError> {
    read_array(r, what).map(f32::from_le_bytes)
}

/// Read an `i32` size field, rejecting negative values.
pub fn read_size(r: &mut dyn Read, what: &str) -> Result<u32, DemoError> {
    let v = read_i32_le(r, what)?;
    u32::try_from(v).map_err(|_| DemoError::corrupt(format!("negative {what}: {v}")))
}

/// Discard exactly `len` bytes.
pub fn skip(r: &mut dyn Read, len: u64, what: &str) -> Result<(), DemoError> {
    let copied = io::copy(&mut r.take(len), &mut io::sink())
        .map_err(|e| DemoError::from_read(e, what))?;
    if copied < len {
        return Err(DemoError::incomplete(format!(
            "eof while reading {what}: got {copied} of {len} bytes"
        )));
    }
    Ok(())
}

/// Decode a NUL-padded fixed-width string.
pub fn nul_terminated(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ── Header ──────────────────────────────────────────────────────

/// Width of the engine version field for a header version.
fn engine_version_len(version: u32) -> Option<usize> {
    match version {
        4 => Some(16),
        5 => Some(256),
        _ => None,
    }
}

/// Bytes taken by the header fields this reader understands.
pub fn known_header_len(version: u32) -> Option<usize> {
    // magic + version + header_size + engine version + game id + unix time
    // + script/stream sizes + game/wallclock time + eight i32 stat sizes
    engine_version_len(version).map(|v| 16 + 4 + 4 + v + 16 + 8 + 4 + 4 + 8 + 8 + 8 * 4)
}

/// Decode and validate the fixed header.
///
/// Headers larger than the known fields are accepted and the surplus is
/// skipped, so newer engines that append fields still parse.
pub fn decode_header(r: &mut dyn Read) -> Result<DemoHeader, DemoError> {
    let magic: [u8; 16] = read_array(r, "magic")?;
    if magic != MAGIC {
        return Err(DemoError::corrupt("invalid magic bytes (expected \"spring demofile\")"));
    }

    let version = read_size(r, "header version")?;
    let Some(version_len) = engine_version_len(version) else {
        return Err(DemoError::corrupt(format!("unsupported header version {version}")));
    };
    let header_size = read_size(r, "header size")?;

    let engine_version = nul_terminated(&read_vec(r, version_len, "engine version")?);
    let game_id = GameId(read_array(r, "game id")?);
    let unix_time = read_u64_le(r, "start time")?;
    let script_size = read_size(r, "script size")?;
    let demo_stream_size = read_size(r, "demo stream size")?;
    let game_time = read_u64_le(r, "game time")?;
    let wallclock_time = read_u64_le(r, "wallclock time")?;

    let header = DemoHeader {
        version,
        header_size,
        engine_version,
        game_id,
        unix_time,
        script_size,
        demo_stream_size,
        game_time,
        wallclock_time,
        num_players: read_size(r, "player count")?,
        player_stat_size: read_size(r, "player stat size")?,
        player_stat_elem_size: read_size(r, "player stat element size")?,
        num_teams: read_size(r, "team count")?,
        team_stat_size: read_size(r, "team stat size")?,
        team_stat_elem_size: read_size(r, "team stat element size")?,
        team_stat_period: read_size(r, "team stat period")?,
        winning_ally_teams_size: read_size(r, "winning ally teams size")?,
    };

    let known = known_header_len(version).unwrap_or_default() as u64;
    let declared = u64::from(header_size);
    if declared < known {
        return Err(DemoError::corrupt(format!(
            "header size {declared} smaller than the {known} bytes of version {version}"
        )));
    }
    skip(r, declared - known, "header padding")?;

    if script_size > MAX_SCRIPT_LEN {
        return Err(DemoError::corrupt(format!("script size {script_size} too large")));
    }
    if header.num_players > MAX_PLAYERS {
        return Err(DemoError::corrupt(format!(
            "player count {} too large",
            header.num_players
        )));
    }
    for (what, size) in [
        ("winning ally teams size", header.winning_ally_teams_size),
        ("player stat size", header.player_stat_size),
        ("team stat size", header.team_stat_size),
    ] {
        if size > MAX_FOOTER_BLOCK_LEN {
            return Err(DemoError::corrupt(format!("{what} {size} too large")));
        }
    }
    if header.num_players > 0 && header.player_stat_elem_size == 0 {
        return Err(DemoError::corrupt(format!(
            "player stats: {} players with zero-length elements",
            header.num_players
        )));
    }
    if u64::from(header.num_players) * u64::from(header.player_stat_elem_size)
        != u64::from(header.player_stat_size)
    {
        return Err(DemoError::corrupt(format!(
            "player stats: {} players x {} bytes != {}",
            header.num_players, header.player_stat_elem_size, header.player_stat_size
        )));
    }

    Ok(header)
}

/// Read the launch script block. A trailing NUL is dropped.
pub fn decode_script(r: &mut dyn Read, script_size: u32) -> Result<String, DemoError> {
    let bytes = read_vec(r, script_size as usize, "script")?;
    Ok(nul_terminated(&bytes))
}

// ── Stream chunks ───────────────────────────────────────────────

/// One chunk of the demo stream: a network packet and the game time at
/// which it was recorded.
#[derive(Clone, Debug, PartialEq)]
pub struct DemoChunk {
    /// Game time in seconds.
    pub game_time: f32,
    /// Raw packet bytes. The first byte is the packet id.
    pub packet: Vec<u8>,
}

/// Decode a single stream chunk.
///
/// Returns `Ok(None)` on clean EOF (no bytes available), `Ok(Some(chunk))`
/// on success, or an error on truncated or corrupt data.
pub fn decode_chunk(r: &mut dyn Read) -> Result<Option<DemoChunk>, DemoError> {
    // Read the time field byte-by-byte to distinguish clean EOF
    // (zero bytes available) from truncation (1-3 bytes before EOF).
    let mut time_buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        match r.read(&mut time_buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(DemoError::incomplete(format!(
                    "truncated chunk header: got {filled} of 4 bytes for game time"
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DemoError::from_read(e, "chunk header")),
        }
    }
    let game_time = f32::from_le_bytes(time_buf);

    let length = read_u32_le(r, "chunk length")?;
    if length == 0 || length > MAX_PACKET_LEN {
        return Err(DemoError::corrupt(format!("chunk length {length} out of range")));
    }
    let packet = read_vec(r, length as usize, "chunk packet")?;

    Ok(Some(DemoChunk { game_time, packet }))
}

// ── Footer ──────────────────────────────────────────────────────

/// Bytes of a player statistics element this reader decodes.
pub const PLAYER_STAT_LEN: usize = 20;

/// Decode the statistics that follow the stream of a finalized demo.
pub fn decode_footer(r: &mut dyn Read, header: &DemoHeader) -> Result<DemoFooter, DemoError> {
    let winning_ally_teams = read_vec(
        r,
        header.winning_ally_teams_size as usize,
        "winning ally teams",
    )?;

    let block = read_vec(r, header.player_stat_size as usize, "player statistics")?;
    let player_statistics = match header.player_stat_elem_size as usize {
        0 => Vec::new(),
        elem => block.chunks_exact(elem).map(decode_player_statistics).collect(),
    };

    skip(r, u64::from(header.team_stat_size), "team statistics")?;

    Ok(DemoFooter {
        winning_ally_teams,
        player_statistics,
    })
}

fn decode_player_statistics(bytes: &[u8]) -> Option<PlayerStatistics> {
    if bytes.len() < PLAYER_STAT_LEN {
        return None;
    }
    let field = |i: usize| {
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
        i32::from_le_bytes(word)
    };
    Some(PlayerStatistics {
        mouse_pixels: field(0),
        mouse_clicks: field(1),
        key_presses: field(2),
        num_commands: field(3),
        unit_commands: field(4),
    })
}

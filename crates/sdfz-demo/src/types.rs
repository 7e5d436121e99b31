//! Core types for demo data: the raw header, the persisted replay record
//! and the roster entries it carries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sdfz_command::DecodedCommand;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered string map. Keys keep launch-script order.
pub type Settings = IndexMap<String, String>;

// ── Game id ─────────────────────────────────────────────────────

/// The 16-byte match identifier the engine assigns at game start.
///
/// Rendered as 32 lowercase hex characters. Every capture of one match
/// (including reconnects) carries the same id.
///
/// # Examples
///
/// ```
/// use sdfz_demo::GameId;
///
/// let id: GameId = "00112233445566778899aabbccddeeff".parse().unwrap();
/// assert_eq!(id.0[1], 0x11);
/// assert_eq!(id.to_string(), "00112233445566778899aabbccddeeff");
/// assert!(!id.is_sentinel());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(pub [u8; 16]);

impl GameId {
    /// Whether the id is all zeros, which the engine writes when it never
    /// assigned one.
    pub fn is_sentinel(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// A string that is not 32 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid game id {0:?}: expected 32 hex characters")]
pub struct InvalidGameId(pub String);

impl FromStr for GameId {
    type Err = InvalidGameId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 32 {
            return Err(InvalidGameId(s.to_owned()));
        }
        let mut id = [0u8; 16];
        for (slot, pair) in id.iter_mut().zip(bytes.chunks_exact(2)) {
            let text = std::str::from_utf8(pair).map_err(|_| InvalidGameId(s.to_owned()))?;
            *slot = u8::from_str_radix(text, 16).map_err(|_| InvalidGameId(s.to_owned()))?;
        }
        Ok(GameId(id))
    }
}

impl Serialize for GameId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for GameId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ── Raw header ──────────────────────────────────────────────────

/// The fixed header exactly as stored in the file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DemoHeader {
    /// Header version (4 or 5).
    pub version: u32,
    /// Declared header length in bytes.
    pub header_size: u32,
    /// Engine version string.
    pub engine_version: String,
    /// Match identifier.
    pub game_id: GameId,
    /// Match start, seconds since the Unix epoch.
    pub unix_time: u64,
    /// Launch script length in bytes.
    pub script_size: u32,
    /// Stream length in bytes. Zero until the engine finalizes the file.
    pub demo_stream_size: u32,
    /// In-game duration in seconds.
    pub game_time: u64,
    /// Real-time duration in seconds.
    pub wallclock_time: u64,
    /// Players with a statistics entry in the footer.
    pub num_players: u32,
    /// Total length of the player statistics block.
    pub player_stat_size: u32,
    /// Length of one player statistics entry.
    pub player_stat_elem_size: u32,
    /// Teams with a statistics entry in the footer.
    pub num_teams: u32,
    /// Total length of the team statistics block.
    pub team_stat_size: u32,
    /// Length of one team statistics sample.
    pub team_stat_elem_size: u32,
    /// Seconds between team statistics samples.
    pub team_stat_period: u32,
    /// Length of the winning ally teams list.
    pub winning_ally_teams_size: u32,
}

impl DemoHeader {
    /// Whether the engine wrote the final sizes, i.e. the match ended
    /// and the file was closed cleanly.
    pub fn is_finalized(&self) -> bool {
        self.demo_stream_size > 0
    }
}

/// Statistics block that follows the stream of a finalized demo.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DemoFooter {
    /// Ally team ids that won the match.
    pub winning_ally_teams: Vec<u8>,
    /// One entry per player slot, in player id order. `None` when the
    /// element is shorter than the fields decoded here.
    pub player_statistics: Vec<Option<PlayerStatistics>>,
}

/// Summary of the header, resolved into domain units.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplayHeader {
    /// Engine version string.
    pub engine_version: String,
    /// Game (mod) version, from the script's `gametype`.
    pub game_version: String,
    /// Map name as the engine knows it, from the script's `mapname`.
    pub map_spring_name: String,
    /// Match identifier.
    pub game_id: GameId,
    /// Match start.
    pub start_time: DateTime<Utc>,
    /// Match length in milliseconds.
    pub duration_ms: u64,
    /// Whether the demo was finalized.
    pub ended_normally: bool,
    /// Header version.
    pub header_version: u32,
    /// Declared header length.
    pub header_size: u32,
    /// Launch script length.
    pub script_size: u32,
    /// Declared stream length (zero when not finalized).
    pub demo_stream_size: u32,
}

// ── Roster ──────────────────────────────────────────────────────

/// Footer statistics for one player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatistics {
    /// Mouse distance in pixels.
    pub mouse_pixels: i32,
    /// Mouse clicks.
    pub mouse_clicks: i32,
    /// Key presses.
    pub key_presses: i32,
    /// Commands issued.
    pub num_commands: i32,
    /// Units affected by those commands.
    pub unit_commands: i32,
}

/// Start position chosen in the launch script.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StartPosition {
    /// X in elmos.
    pub x: f32,
    /// Z in elmos.
    pub z: f32,
}

/// Start box of an ally team, as fractions of the map size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StartBox {
    /// Left edge.
    pub left: f32,
    /// Top edge.
    pub top: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
}

/// A human player who controlled a team.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Player slot.
    pub player_id: u32,
    /// Display name.
    pub name: String,
    /// Team the player controlled.
    pub team_id: u32,
    /// Ally team of that team.
    pub ally_team_id: u32,
    /// Lobby account id.
    pub user_id: Option<u64>,
    /// Lobby rank.
    pub rank: Option<i32>,
    /// Skill as written by the host (e.g. `"[21.5]"`).
    pub skill: Option<String>,
    /// Two-letter country code.
    pub country_code: Option<String>,
    /// Faction (team side).
    pub faction: Option<String>,
    /// Team colour, components in `0.0..=1.0`.
    pub rgb_color: Option<[f32; 3]>,
    /// Start position.
    pub start_position: Option<StartPosition>,
    /// Footer statistics.
    pub statistics: Option<PlayerStatistics>,
}

/// An AI that controlled a team.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ai {
    /// AI slot.
    pub ai_id: u32,
    /// Display name.
    pub name: String,
    /// AI library short name.
    pub short_name: String,
    /// AI library version.
    pub version: Option<String>,
    /// Player hosting the AI.
    pub host_player_id: Option<u32>,
    /// Team the AI controlled.
    pub team_id: u32,
    /// Ally team of that team.
    pub ally_team_id: u32,
    /// Faction (team side).
    pub faction: Option<String>,
    /// Team colour.
    pub rgb_color: Option<[f32; 3]>,
}

/// A participant that controlled a team.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Contender {
    /// A human player.
    Player(Player),
    /// An AI.
    Ai(Ai),
}

impl Contender {
    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            Contender::Player(p) => &p.name,
            Contender::Ai(a) => &a.name,
        }
    }

    /// Team controlled.
    pub fn team_id(&self) -> u32 {
        match self {
            Contender::Player(p) => p.team_id,
            Contender::Ai(a) => a.team_id,
        }
    }

    /// Ally team.
    pub fn ally_team_id(&self) -> u32 {
        match self {
            Contender::Player(p) => p.ally_team_id,
            Contender::Ai(a) => a.ally_team_id,
        }
    }
}

/// A player who watched without controlling a team.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spectator {
    /// Player slot.
    pub player_id: u32,
    /// Display name.
    pub name: String,
    /// Lobby account id.
    pub user_id: Option<u64>,
    /// Lobby rank.
    pub rank: Option<i32>,
    /// Two-letter country code.
    pub country_code: Option<String>,
}

/// A group of allied teams.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllyTeam {
    /// Ally team id.
    pub ally_team_id: u32,
    /// Teams in this alliance, ascending.
    pub team_ids: Vec<u32>,
    /// Start box.
    pub start_box: Option<StartBox>,
    /// Whether the footer lists this ally team as a winner.
    pub winning: bool,
}

// ── Stream content ──────────────────────────────────────────────

/// Who a chat line was addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", content = "player_id", rename_all = "snake_case")]
pub enum ChatRecipient {
    /// Everyone in the match.
    Everyone,
    /// The sender's allies.
    Allies,
    /// Spectators only.
    Spectators,
    /// A single player (whisper).
    Player(u8),
}

impl ChatRecipient {
    /// Resolve the destination byte of a chat packet.
    pub fn from_wire(dest: u8) -> Self {
        match dest {
            252 => ChatRecipient::Allies,
            253 => ChatRecipient::Spectators,
            254 => ChatRecipient::Everyone,
            id => ChatRecipient::Player(id),
        }
    }
}

/// One chat line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Game time when sent.
    pub game_time_ms: u64,
    /// Sending player slot.
    pub from_player_id: u8,
    /// Addressee.
    pub recipient: ChatRecipient,
    /// Text.
    pub message: String,
}

/// A unit command with the time and issuer it was recorded with.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimedCommand {
    /// Game time when issued.
    pub game_time_ms: u64,
    /// Issuing player slot.
    pub player_id: u8,
    /// Issuing AI, for AI commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_id: Option<u8>,
    /// The decoded command.
    pub command: DecodedCommand,
}

/// Packet counts over a demo stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PacketStats {
    /// All chunks read.
    pub total: u64,
    /// Player unit commands.
    pub commands: u64,
    /// AI unit commands.
    pub ai_commands: u64,
    /// Chat lines.
    pub chats: u64,
    /// Game start signals.
    pub start_playing: u64,
    /// Game over announcements.
    pub game_over: u64,
    /// Players leaving.
    pub player_left: u64,
    /// Lua messages.
    pub lua_messages: u64,
    /// Packets not decoded further.
    pub other: u64,
    /// Packets whose framing did not match their id.
    pub malformed: u64,
}

// ── Persisted record ────────────────────────────────────────────

/// Everything the cache keeps about one demo file.
///
/// Serialized with serde; JSON is the at-rest encoding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// File name within the demo directory. Unique.
    pub file_name: String,
    /// Match identifier. Shared by every capture of one match.
    pub game_id: GameId,
    /// Engine version the match ran on.
    pub engine_version: String,
    /// Game (mod) version, `game.gametype`.
    pub game_version: String,
    /// Map name, `game.mapname`.
    pub map_spring_name: String,
    /// Match start.
    pub start_time: DateTime<Utc>,
    /// Match length in milliseconds.
    pub duration_ms: u64,
    /// Whether the engine finalized the demo.
    pub ended_normally: bool,
    /// Ally teams, by id.
    pub teams: Vec<AllyTeam>,
    /// Players then AIs, each by id.
    pub contenders: Vec<Contender>,
    /// Spectators, by id.
    pub spectators: Vec<Spectator>,
    /// Chat log, when requested.
    pub chatlog: Option<Vec<ChatMessage>>,
    /// Launch script text.
    pub script: String,
    /// Scalar keys of `[game]`.
    pub battle_settings: Settings,
    /// `[game][modoptions]`.
    pub game_settings: Settings,
    /// `[game][mapoptions]`.
    pub map_settings: Settings,
    /// `[game][hostoptions]`.
    pub host_settings: Settings,
}

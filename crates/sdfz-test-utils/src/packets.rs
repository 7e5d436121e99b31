//! Encoders for the stream packets the reader decodes.

pub const START_PLAYING: u8 = 3;
pub const CHAT: u8 = 7;
pub const COMMAND: u8 = 11;
pub const AI_COMMAND: u8 = 14;
pub const GAME_OVER: u8 = 30;
pub const PLAYER_LEFT: u8 = 39;
pub const LUA_MSG: u8 = 50;

fn push_params(out: &mut Vec<u8>, params: &[f32]) {
    for p in params {
        out.extend_from_slice(&p.to_le_bytes());
    }
}

/// `[11][size u16][player][command i32][options][f32 params]`
pub fn command(player: u8, command_id: i32, options: u8, params: &[f32]) -> Vec<u8> {
    let size = 9 + 4 * params.len();
    let mut out = vec![COMMAND];
    out.extend_from_slice(&(size as u16).to_le_bytes());
    out.push(player);
    out.extend_from_slice(&command_id.to_le_bytes());
    out.push(options);
    push_params(&mut out, params);
    out
}

/// `[14][size u16][player][ai][unit u16][command i32][options][f32 params]`
pub fn ai_command(
    player: u8,
    ai: u8,
    unit: u16,
    command_id: i32,
    options: u8,
    params: &[f32],
) -> Vec<u8> {
    let size = 12 + 4 * params.len();
    let mut out = vec![AI_COMMAND];
    out.extend_from_slice(&(size as u16).to_le_bytes());
    out.push(player);
    out.push(ai);
    out.extend_from_slice(&unit.to_le_bytes());
    out.extend_from_slice(&command_id.to_le_bytes());
    out.push(options);
    push_params(&mut out, params);
    out
}

/// `[7][size u8][from][dest][text\0]`
pub fn chat(from: u8, dest: u8, text: &str) -> Vec<u8> {
    let size = 4 + text.len() + 1;
    let mut out = vec![CHAT, size as u8, from, dest];
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    out
}

/// `[3][countdown u32]`
pub fn start_playing(countdown: u32) -> Vec<u8> {
    let mut out = vec![START_PLAYING];
    out.extend_from_slice(&countdown.to_le_bytes());
    out
}

/// `[30][size u8][player][winners]`
pub fn game_over(player: u8, winners: &[u8]) -> Vec<u8> {
    let mut out = vec![GAME_OVER, (3 + winners.len()) as u8, player];
    out.extend_from_slice(winners);
    out
}

/// `[39][player][reason]`
pub fn player_left(player: u8, reason: u8) -> Vec<u8> {
    vec![PLAYER_LEFT, player, reason]
}

/// `[50][size u16][player][script u16][mode][data]`
pub fn lua_msg(player: u8, script: u16, mode: u8, data: &[u8]) -> Vec<u8> {
    let size = 7 + data.len();
    let mut out = vec![LUA_MSG];
    out.extend_from_slice(&(size as u16).to_le_bytes());
    out.push(player);
    out.extend_from_slice(&script.to_le_bytes());
    out.push(mode);
    out.extend_from_slice(data);
    out
}

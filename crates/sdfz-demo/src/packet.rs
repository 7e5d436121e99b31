//! Network packets carried by the demo stream.
//!
//! Every stream chunk holds one packet; its first byte is the packet id.
//! Only the packets the replay record or the command stream needs are
//! decoded. The rest are reported as [`Packet::Other`].

use sdfz_command::RawCommand;

use crate::error::DemoError;
use crate::types::ChatRecipient;

/// Packet ids decoded by [`decode_packet`].
pub mod ids {
    /// Countdown to game start.
    pub const START_PLAYING: u8 = 3;
    /// Chat line.
    pub const CHAT: u8 = 7;
    /// Player unit command.
    pub const COMMAND: u8 = 11;
    /// AI unit command.
    pub const AI_COMMAND: u8 = 14;
    /// Game over announcement.
    pub const GAME_OVER: u8 = 30;
    /// A player left.
    pub const PLAYER_LEFT: u8 = 39;
    /// Lua message.
    pub const LUA_MSG: u8 = 50;
}

/// A decoded stream packet.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// The game starts after `countdown` seconds (zero once running).
    StartPlaying {
        /// Seconds left.
        countdown: u32,
    },
    /// A chat line.
    Chat {
        /// Sending player slot.
        from: u8,
        /// Addressee.
        recipient: ChatRecipient,
        /// Text, without the trailing NUL.
        message: String,
    },
    /// A unit command issued by a player.
    Command {
        /// Issuing player slot.
        player_id: u8,
        /// The command.
        command: RawCommand,
    },
    /// A unit command issued by an AI. The command carries the unit id.
    AiCommand {
        /// Player slot hosting the AI.
        player_id: u8,
        /// AI slot.
        ai_id: u8,
        /// The command.
        command: RawCommand,
    },
    /// A player announced the end of the game.
    GameOver {
        /// Announcing player slot.
        player_id: u8,
        /// Ally teams that won.
        winning_ally_teams: Vec<u8>,
    },
    /// A player left the game.
    PlayerLeft {
        /// Player slot.
        player_id: u8,
        /// Engine reason code.
        reason: u8,
    },
    /// A Lua message.
    LuaMsg {
        /// Sending player slot.
        player_id: u8,
        /// Lua script id.
        script_id: u16,
        /// Message mode.
        mode: u8,
        /// Payload.
        data: Vec<u8>,
    },
    /// Any other packet.
    Other {
        /// Packet id.
        id: u8,
    },
}

/// Bounds-checked little-endian reads over one packet.
struct PacketCursor<'a> {
    id: u8,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PacketCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        // The id byte is consumed by the caller's dispatch.
        Self {
            id: bytes.first().copied().unwrap_or_default(),
            bytes,
            pos: 1,
        }
    }

    fn malformed(&self, detail: impl Into<String>) -> DemoError {
        DemoError::MalformedPacket {
            packet_id: self.id,
            detail: detail.into(),
        }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], DemoError> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(self.malformed(format!(
                "{what} needs {n} bytes at offset {}, packet is {} bytes",
                self.pos,
                self.bytes.len()
            )));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], DemoError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> Result<u8, DemoError> {
        self.array::<1>(what).map(|[b]| b)
    }

    fn u16(&mut self, what: &str) -> Result<u16, DemoError> {
        self.array(what).map(u16::from_le_bytes)
    }

    fn u32(&mut self, what: &str) -> Result<u32, DemoError> {
        self.array(what).map(u32::from_le_bytes)
    }

    fn i32(&mut self, what: &str) -> Result<i32, DemoError> {
        self.array(what).map(i32::from_le_bytes)
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos.min(self.bytes.len())..];
        self.pos = self.bytes.len();
        slice
    }

    /// Check an embedded size field against the real packet length.
    fn expect_size(&self, declared: usize) -> Result<(), DemoError> {
        if declared != self.bytes.len() {
            return Err(self.malformed(format!(
                "declared size {declared} but packet is {} bytes",
                self.bytes.len()
            )));
        }
        Ok(())
    }

    fn expect_len(&self, len: usize) -> Result<(), DemoError> {
        if self.bytes.len() != len {
            return Err(self.malformed(format!(
                "expected {len} bytes, packet is {} bytes",
                self.bytes.len()
            )));
        }
        Ok(())
    }

    /// Remaining bytes as `f32` parameters widened to `f64`.
    fn params(&mut self) -> Result<Vec<f64>, DemoError> {
        let rest = self.rest();
        if rest.len() % 4 != 0 {
            return Err(self.malformed(format!(
                "{} parameter bytes is not a whole number of floats",
                rest.len()
            )));
        }
        Ok(rest
            .chunks_exact(4)
            .map(|w| f64::from(f32::from_le_bytes([w[0], w[1], w[2], w[3]])))
            .collect())
    }
}

/// Decode one packet.
///
/// Unknown ids decode as [`Packet::Other`]. A known id whose framing does
/// not match its layout is [`DemoError::MalformedPacket`]; callers count
/// these and keep reading.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, DemoError> {
    let Some(&id) = bytes.first() else {
        return Err(DemoError::MalformedPacket {
            packet_id: 0,
            detail: "empty packet".into(),
        });
    };
    let mut c = PacketCursor::new(bytes);

    match id {
        ids::START_PLAYING => {
            c.expect_len(5)?;
            Ok(Packet::StartPlaying {
                countdown: c.u32("countdown")?,
            })
        }
        ids::CHAT => {
            let size = c.u8("size")?;
            c.expect_size(usize::from(size))?;
            let from = c.u8("sender")?;
            let dest = c.u8("destination")?;
            let text = c.rest();
            let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
            Ok(Packet::Chat {
                from,
                recipient: ChatRecipient::from_wire(dest),
                message: String::from_utf8_lossy(&text[..end]).into_owned(),
            })
        }
        ids::COMMAND => {
            let size = c.u16("size")?;
            c.expect_size(usize::from(size))?;
            let player_id = c.u8("player")?;
            let command_id = c.i32("command id")?;
            let options = c.u8("options")?;
            let params = c.params()?;
            Ok(Packet::Command {
                player_id,
                command: RawCommand::new(command_id, options, &params),
            })
        }
        ids::AI_COMMAND => {
            let size = c.u16("size")?;
            c.expect_size(usize::from(size))?;
            let player_id = c.u8("player")?;
            let ai_id = c.u8("ai")?;
            let unit_id = c.u16("unit")?;
            let command_id = c.i32("command id")?;
            let options = c.u8("options")?;
            let params = c.params()?;
            Ok(Packet::AiCommand {
                player_id,
                ai_id,
                command: RawCommand::new(command_id, options, &params)
                    .with_unit(u32::from(unit_id)),
            })
        }
        ids::GAME_OVER => {
            let size = c.u8("size")?;
            c.expect_size(usize::from(size))?;
            let player_id = c.u8("player")?;
            Ok(Packet::GameOver {
                player_id,
                winning_ally_teams: c.rest().to_vec(),
            })
        }
        ids::PLAYER_LEFT => {
            c.expect_len(3)?;
            Ok(Packet::PlayerLeft {
                player_id: c.u8("player")?,
                reason: c.u8("reason")?,
            })
        }
        ids::LUA_MSG => {
            let size = c.u16("size")?;
            c.expect_size(usize::from(size))?;
            let player_id = c.u8("player")?;
            let script_id = c.u16("script")?;
            let mode = c.u8("mode")?;
            Ok(Packet::LuaMsg {
                player_id,
                script_id,
                mode,
                data: c.rest().to_vec(),
            })
        }
        other => Ok(Packet::Other { id: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_packet(player: u8, cmd: i32, opts: u8, params: &[f32]) -> Vec<u8> {
        let size = 9 + params.len() * 4;
        let mut p = vec![ids::COMMAND];
        p.extend_from_slice(&(size as u16).to_le_bytes());
        p.push(player);
        p.extend_from_slice(&cmd.to_le_bytes());
        p.push(opts);
        for v in params {
            p.extend_from_slice(&v.to_le_bytes());
        }
        p
    }

    #[test]
    fn decodes_command() {
        let bytes = command_packet(2, 10, 32, &[100.0, 5.0, 200.0]);
        let Packet::Command { player_id, command } = decode_packet(&bytes).unwrap() else {
            panic!("expected a command");
        };
        assert_eq!(player_id, 2);
        assert_eq!(command.command_id, 10);
        assert_eq!(command.options, 32);
        assert_eq!(command.params.as_slice(), &[100.0, 5.0, 200.0]);
        assert_eq!(command.unit_id, None);
    }

    #[test]
    fn command_size_mismatch_is_malformed() {
        let mut bytes = command_packet(0, 0, 0, &[]);
        bytes[1] = 42;
        let err = decode_packet(&bytes).unwrap_err();
        assert!(matches!(err, DemoError::MalformedPacket { packet_id: 11, .. }));
    }

    #[test]
    fn ragged_params_are_malformed() {
        let mut bytes = command_packet(0, 10, 0, &[1.0]);
        bytes.push(0);
        let size = bytes.len() as u16;
        bytes[1..3].copy_from_slice(&size.to_le_bytes());
        assert!(decode_packet(&bytes).is_err());
    }

    #[test]
    fn decodes_ai_command_with_unit() {
        let mut p = vec![ids::AI_COMMAND];
        p.extend_from_slice(&16u16.to_le_bytes());
        p.push(1);
        p.push(0);
        p.extend_from_slice(&777u16.to_le_bytes());
        p.extend_from_slice(&25i32.to_le_bytes());
        p.push(0);
        p.extend_from_slice(&42f32.to_le_bytes());
        let Packet::AiCommand { ai_id, command, .. } = decode_packet(&p).unwrap() else {
            panic!("expected an ai command");
        };
        assert_eq!(ai_id, 0);
        assert_eq!(command.unit_id, Some(777));
        assert_eq!(command.params.as_slice(), &[42.0]);
    }

    #[test]
    fn decodes_chat() {
        let text = b"gl hf\0";
        let mut p = vec![ids::CHAT, (4 + text.len()) as u8, 3, 254];
        p.extend_from_slice(text);
        assert_eq!(
            decode_packet(&p).unwrap(),
            Packet::Chat {
                from: 3,
                recipient: ChatRecipient::Everyone,
                message: "gl hf".into()
            }
        );
    }

    #[test]
    fn decodes_game_over_and_player_left() {
        let p = [ids::GAME_OVER, 5, 0, 1, 2];
        assert_eq!(
            decode_packet(&p).unwrap(),
            Packet::GameOver {
                player_id: 0,
                winning_ally_teams: vec![1, 2]
            }
        );
        assert_eq!(
            decode_packet(&[ids::PLAYER_LEFT, 4, 1]).unwrap(),
            Packet::PlayerLeft {
                player_id: 4,
                reason: 1
            }
        );
    }

    #[test]
    fn short_fixed_packet_is_malformed() {
        assert!(decode_packet(&[ids::START_PLAYING, 0, 0]).is_err());
        assert!(decode_packet(&[ids::PLAYER_LEFT]).is_err());
    }

    #[test]
    fn unknown_ids_are_other() {
        assert_eq!(decode_packet(&[2, 9, 9]).unwrap(), Packet::Other { id: 2 });
    }

    #[test]
    fn empty_packet_is_malformed() {
        assert!(decode_packet(&[]).is_err());
    }
}

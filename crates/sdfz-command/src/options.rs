//! Command option bitmask.

use serde::Serialize;

/// Meta key held when the command was issued.
pub const META_KEY: u8 = 4;
/// Command was generated internally rather than by player input.
pub const INTERNAL_ORDER: u8 = 8;
/// Issued with the right mouse button.
pub const RIGHT_MOUSE_KEY: u8 = 16;
/// Shift held (queue the command).
pub const SHIFT_KEY: u8 = 32;
/// Control held.
pub const CONTROL_KEY: u8 = 64;
/// Alt held.
pub const ALT_KEY: u8 = 128;

/// Decoded option flags of a command.
///
/// Flags are tested with a bitwise AND, so any combination can be set at
/// once. Bits 0 and 1 carry no flag and are ignored.
///
/// # Examples
///
/// ```
/// use sdfz_command::CommandOptions;
///
/// let options = CommandOptions::from_bits(32 | 64);
/// assert!(options.shift_key);
/// assert!(options.control_key);
/// assert!(!options.alt_key);
/// assert_eq!(options.bits(), 96);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CommandOptions {
    /// [`META_KEY`] was set.
    pub meta_key: bool,
    /// [`INTERNAL_ORDER`] was set.
    pub internal_order: bool,
    /// [`RIGHT_MOUSE_KEY`] was set.
    pub right_mouse_key: bool,
    /// [`SHIFT_KEY`] was set.
    pub shift_key: bool,
    /// [`CONTROL_KEY`] was set.
    pub control_key: bool,
    /// [`ALT_KEY`] was set.
    pub alt_key: bool,
}

impl CommandOptions {
    /// Decode a wire option bitmask.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            meta_key: bits & META_KEY != 0,
            internal_order: bits & INTERNAL_ORDER != 0,
            right_mouse_key: bits & RIGHT_MOUSE_KEY != 0,
            shift_key: bits & SHIFT_KEY != 0,
            control_key: bits & CONTROL_KEY != 0,
            alt_key: bits & ALT_KEY != 0,
        }
    }

    /// Re-encode the flags as a wire bitmask.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        for (set, bit) in [
            (self.meta_key, META_KEY),
            (self.internal_order, INTERNAL_ORDER),
            (self.right_mouse_key, RIGHT_MOUSE_KEY),
            (self.shift_key, SHIFT_KEY),
            (self.control_key, CONTROL_KEY),
            (self.alt_key, ALT_KEY),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_has_no_flags() {
        assert_eq!(CommandOptions::from_bits(0), CommandOptions::default());
    }

    #[test]
    fn shift_and_control_combine() {
        let options = CommandOptions::from_bits(96);
        assert_eq!(
            options,
            CommandOptions {
                shift_key: true,
                control_key: true,
                ..CommandOptions::default()
            }
        );
    }

    #[test]
    fn low_bits_are_ignored() {
        assert_eq!(CommandOptions::from_bits(0b11), CommandOptions::default());
        assert_eq!(CommandOptions::from_bits(0xFF).bits(), 0xFC);
    }

    #[test]
    fn every_flag_is_independent() {
        for bit in [META_KEY, INTERNAL_ORDER, RIGHT_MOUSE_KEY, SHIFT_KEY, CONTROL_KEY, ALT_KEY] {
            assert_eq!(CommandOptions::from_bits(bit).bits(), bit);
        }
    }
}

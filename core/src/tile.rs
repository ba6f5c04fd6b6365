use serde::{Deserialize, Serialize};

use crate::{GameError, Result};

/// Player-visible state of one tile, decoded from the engine's wire alphabet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileState {
    Hidden,
    Blank,
    /// Revealed tile with 1 to 8 adjacent mines.
    Numbered(u8),
    Mine,
    /// First mark state.
    Flagged,
    /// Second mark state.
    Questioned,
    Hint,
}

impl TileState {
    pub fn from_wire(code: char) -> Result<Self> {
        use TileState::*;
        Ok(match code {
            '#' => Hidden,
            ' ' | '0' => Blank,
            '1'..='8' => Numbered(code as u8 - b'0'),
            'X' => Mine,
            '!' => Flagged,
            '?' => Questioned,
            'O' => Hint,
            _ => return Err(GameError::UnknownTile(code)),
        })
    }

    pub const fn to_wire(self) -> char {
        use TileState::*;
        match self {
            Hidden => '#',
            Blank => ' ',
            Numbered(count) => (b'0' + count) as char,
            Mine => 'X',
            Flagged => '!',
            Questioned => '?',
            Hint => 'O',
        }
    }

    // whether the tile is still covered from the player's point of view
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Hidden | Self::Flagged | Self::Questioned | Self::Hint)
    }

    pub fn class_name(self) -> String {
        use TileState::*;
        match self {
            Hidden => "hidden".into(),
            Blank => "blank".into(),
            Numbered(count) => format!("num-{}", count),
            Mine => "mine".into(),
            Flagged => "flag".into(),
            Questioned => "question".into(),
            Hint => "hint".into(),
        }
    }

    pub const fn glyph(self) -> char {
        match self {
            Self::Hidden => '-',
            Self::Blank => '_',
            other => other.to_wire(),
        }
    }
}

impl Default for TileState {
    fn default() -> Self {
        Self::Hidden
    }
}

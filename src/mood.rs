//! Mood registry
//!
//! Maps every [`Mood`] to its display name and to the sprite bitmap that was
//! converted from `sprites/<name>.png` at build time.

use core::fmt;

/// 1-bit sprite bitmap
///
/// Rows are packed MSB first and padded to whole bytes. A set bit is ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteAsset {
    /// Packed pixel rows
    pub data: &'static [u8],
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl SpriteAsset {
    /// Bytes per packed row
    pub const fn stride(&self) -> usize {
        self.width.div_ceil(8) as usize
    }
}

mod sprites {
    use super::SpriteAsset;

    include!(concat!(env!("OUT_DIR"), "/sprites.rs"));
}

/// Everything the device can look like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mood {
    Sleeping,
    #[default]
    Idle,
    Alert,
    Thinking,
    Talking,
    Working,
    Excited,
    Error,
}

impl Mood {
    /// All moods, in declaration order
    pub const ALL: [Mood; 8] = [
        Mood::Sleeping,
        Mood::Idle,
        Mood::Alert,
        Mood::Thinking,
        Mood::Talking,
        Mood::Working,
        Mood::Excited,
        Mood::Error,
    ];

    /// Resolve a mood token from a payload
    ///
    /// Only the exact lowercase names are recognized. Anything else, including
    /// a missing value, is `Idle`.
    pub fn from_name(name: Option<&str>) -> Mood {
        match name {
            Some("sleeping") => Mood::Sleeping,
            Some("idle") => Mood::Idle,
            Some("alert") => Mood::Alert,
            Some("thinking") => Mood::Thinking,
            Some("talking") => Mood::Talking,
            Some("working") => Mood::Working,
            Some("excited") => Mood::Excited,
            Some("error") => Mood::Error,
            _ => Mood::Idle,
        }
    }

    /// Uppercase label drawn under the sprite
    pub const fn display_name(self) -> &'static str {
        match self {
            Mood::Sleeping => "SLEEPING",
            Mood::Idle => "IDLE",
            Mood::Alert => "ALERT",
            Mood::Thinking => "THINKING",
            Mood::Talking => "TALKING",
            Mood::Working => "WORKING",
            Mood::Excited => "EXCITED",
            Mood::Error => "ERROR",
        }
    }

    /// Sprite bitmap for this mood
    pub const fn sprite(self) -> SpriteAsset {
        match self {
            Mood::Sleeping => sprites::SLEEPING,
            Mood::Idle => sprites::IDLE,
            Mood::Alert => sprites::ALERT,
            Mood::Thinking => sprites::THINKING,
            Mood::Talking => sprites::TALKING,
            Mood::Working => sprites::WORKING,
            Mood::Excited => sprites::EXCITED,
            Mood::Error => sprites::ERROR,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

//! Developer cheat hook.
//!
//! A cheat console is an optional capability. The engine registers its
//! presets when one is present and works identically without one.

use serde::{Deserialize, Serialize};

pub const LIVES_CHEAT_ID: &str = "lives";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheatPreset {
    /// Empty the pool.
    None,
    Half,
    Full,
    Infinity1m,
    Infinity5m,
    Infinity30m,
}

impl CheatPreset {
    pub const ALL: [CheatPreset; 6] = [
        Self::None,
        Self::Half,
        Self::Full,
        Self::Infinity1m,
        Self::Infinity5m,
        Self::Infinity30m,
    ];

    /// Unlimited minutes granted by this preset, if any.
    pub fn unlimited_minutes(&self) -> Option<u32> {
        match self {
            Self::Infinity1m => Some(1),
            Self::Infinity5m => Some(5),
            Self::Infinity30m => Some(30),
            Self::None | Self::Half | Self::Full => None,
        }
    }
}

/// What the engine publishes to a cheat console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheatEntry {
    pub id: &'static str,
    pub title_loc_id: &'static str,
    pub presets: Vec<CheatPreset>,
}

impl CheatEntry {
    pub fn lives() -> Self {
        Self {
            id: LIVES_CHEAT_ID,
            title_loc_id: "ui.dev.cheat.lives",
            presets: CheatPreset::ALL.to_vec(),
        }
    }
}

/// A developer console that lists cheats. Selecting a preset is routed
/// back by the host through `LivesEngine::apply_cheat`.
pub trait CheatConsole: Send {
    fn register_cheat(&mut self, entry: CheatEntry);
    fn unregister_cheat(&mut self, id: &str);
}

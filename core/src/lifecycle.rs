//! Game states the lives pool reacts to.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Init,
    Loading,
    Menu,
    Level,
    Win,
    Fail,
}

impl GameState {
    /// States in which a life is being consumed.
    pub fn is_gameplay(&self) -> bool {
        matches!(self, Self::Level)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_victory(&self) -> bool {
        matches!(self, Self::Win)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail)
    }

    /// Leaving gameplay for one of these states costs a life.
    pub fn charges_life_on_entry(&self) -> bool {
        self.is_loading() || self.is_failure()
    }
}

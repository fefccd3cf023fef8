//! Shared primitive types used across the lives engine.

/// A point or span on the injected time source, in seconds.
/// Checkpoints are measured from the time source's own epoch.
pub type Seconds = f64;

/// A whole number of lives.
pub type Lives = u32;

/// Key under which a save record lives in the save backend.
pub type SaveKey = &'static str;

/// Save key for the lives pool.
pub const LIVES_SAVE_KEY: SaveKey = "lives";

//! The persisted lives record and its flat key/value form.
//!
//! The record is written as one JSON object of primitives under stable keys.
//! Keys are part of the save format: never rename or reuse them.

use crate::{
    error::{LivesError, LivesResult},
    types::{Lives, Seconds},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flat mapping of primitive values, as handed to a save backend.
pub type SaveRecord = BTreeMap<String, serde_json::Value>;

pub const KEY_COUNT: &str = "count";
pub const KEY_MAX_COUNT: &str = "max_count";
pub const KEY_UNLIMITED_REMAINING: &str = "inf_time";
pub const KEY_UNLIMITED_VERIFIED: &str = "verif_inf_time";
pub const KEY_LAST_RESTORE: &str = "rest_time";
pub const KEY_ACTIVE_SESSION: &str = "is_gameplay";

const RECORD_KEYS: [&str; 6] = [
    KEY_COUNT,
    KEY_MAX_COUNT,
    KEY_UNLIMITED_REMAINING,
    KEY_UNLIMITED_VERIFIED,
    KEY_LAST_RESTORE,
    KEY_ACTIVE_SESSION,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(rename = "count")]
    pub count: Lives,
    #[serde(rename = "max_count")]
    pub max_count: Lives,
    /// Instant normal regeneration is measured from.
    #[serde(rename = "rest_time")]
    pub last_restore: Seconds,
    /// Seconds of unlimited mode left. `<= 0` means inactive.
    #[serde(rename = "inf_time")]
    pub unlimited_remaining: Seconds,
    /// Instant unlimited decay was last applied.
    #[serde(rename = "verif_inf_time")]
    pub unlimited_verified: Seconds,
    /// Pool was in gameplay when last persisted.
    #[serde(rename = "is_gameplay")]
    pub was_active_session: bool,
}

impl ResourceState {
    /// A first-run record: full pool, both checkpoints at `now`.
    pub fn fresh(max_count: Lives, now: Seconds) -> Self {
        Self {
            count: max_count,
            max_count,
            last_restore: now,
            unlimited_remaining: 0.0,
            unlimited_verified: now,
            was_active_session: false,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited_remaining > 0.0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.max_count
    }

    /// Add units, clamped to capacity. Returns the units actually added.
    pub fn add_clamped(&mut self, amount: u64) -> Lives {
        let headroom = self.max_count.saturating_sub(self.count);
        let added = amount.min(u64::from(headroom)) as Lives;
        self.count += added;
        added
    }

    /// Restore `0 <= count <= max_count` and `max_count > 0` after loading
    /// data this process did not write.
    pub fn normalize(&mut self, fallback_max: Lives) {
        if self.max_count == 0 {
            log::warn!("lives: stored max_count is 0, using configured {fallback_max}");
            self.max_count = fallback_max;
        }
        if self.count > self.max_count {
            log::warn!(
                "lives: stored count {} exceeds max {}, clamping",
                self.count,
                self.max_count
            );
            self.count = self.max_count;
        }
        if !self.unlimited_remaining.is_finite() {
            self.unlimited_remaining = 0.0;
        }
    }

    /// Flatten into the six-key save record.
    pub fn to_record(&self) -> LivesResult<SaveRecord> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(LivesError::MalformedRecord {
                key: "<root>".into(),
                reason: format!("expected an object, got {other}"),
            }),
        }
    }

    /// Overlay a loaded record on top of `self`. Keys missing from the
    /// record keep the value they have in `self`; unknown keys are ignored.
    pub fn merged_with(&self, record: &SaveRecord) -> LivesResult<Self> {
        let mut merged = self.to_record()?;
        for key in RECORD_KEYS {
            if let Some(value) = record.get(key) {
                merged.insert(key.to_string(), coerce(key, value)?);
            }
        }
        for key in record.keys().filter(|k| !RECORD_KEYS.contains(&k.as_str())) {
            log::debug!("lives: ignoring unknown save key '{key}'");
        }

        let object: serde_json::Map<String, serde_json::Value> = merged.into_iter().collect();
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }
}

/// Accept the loose primitive encodings other writers produce: integral
/// floats for counts, 0/1 for the session flag.
fn coerce(key: &str, value: &serde_json::Value) -> LivesResult<serde_json::Value> {
    use serde_json::Value;

    let malformed = |reason: &str| LivesError::MalformedRecord {
        key: key.to_string(),
        reason: format!("{reason}, got {value}"),
    };

    match key {
        KEY_COUNT | KEY_MAX_COUNT => match value {
            Value::Number(n) if n.is_u64() => Ok(value.clone()),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(Lives::MAX) => {
                    Ok(Value::from(f as u64))
                }
                _ => Err(malformed("expected a non-negative integer")),
            },
            _ => Err(malformed("expected a non-negative integer")),
        },
        KEY_ACTIVE_SESSION => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
            _ => Err(malformed("expected a boolean")),
        },
        _ => match value {
            Value::Number(_) => Ok(value.clone()),
            _ => Err(malformed("expected a number")),
        },
    }
}

//! The lives engine: owns the pool and every rule that mutates it.
//!
//! UPDATE PATHS:
//!   1. reconcile(now): analytic catch-up from the persisted checkpoints.
//!      Authoritative. Re-bases the checkpoints and the live countdown.
//!   2. tick(delta):    cheap per-frame countdown between reconciles.
//!      Only runs after the first reconcile.
//!
//! RULES:
//!   - 0 <= count <= max_count after every public call.
//!   - Unlimited mode suppresses spending and normal regeneration.
//!   - Leaving unlimited mode always leaves the pool full.
//!   - Tick-side unlimited decay is held in memory and never persisted:
//!     the saved (inf_time, verif_inf_time) pair always encodes the true
//!     expiry instant, so reconcile can never charge an interval twice.
//!   - Every externally visible change is published to all sinks, then
//!     flushed to the save backend. A failed flush is retried on the
//!     next change.

use crate::{
    cheat::{CheatConsole, CheatEntry, CheatPreset, LIVES_CHEAT_ID},
    clock::TimeSource,
    config::PoolConfig,
    error::LivesResult,
    event::{EventSink, PoolSnapshot},
    lifecycle::GameState,
    reconcile::{compute_infinity_decay, compute_normal_catch_up},
    state::{ResourceState, SaveRecord},
    store::SaveBackend,
    types::{Lives, Seconds, LIVES_SAVE_KEY},
};

/// Something that refills the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Whole lives, clamped to capacity.
    Units(Lives),
    /// Minutes of unlimited mode, added to any time already left.
    UnlimitedMinutes(u32),
}

pub struct LivesEngine {
    config:      PoolConfig,
    state:       ResourceState,
    /// Seconds until tick() restores the next life.
    countdown:   Seconds,
    /// Unlimited time consumed by tick() since the last re-base.
    tick_decay:  Seconds,
    initialized: bool,
    /// Last flush failed; the next change retries it.
    dirty:       bool,
    clock:       Box<dyn TimeSource>,
    backend:     Box<dyn SaveBackend>,
    sinks:       Vec<Box<dyn EventSink>>,
    cheats:      Option<Box<dyn CheatConsole>>,
}

impl LivesEngine {
    /// Build an engine with a fresh, full pool. Call `load()` to restore
    /// saved progress.
    pub fn new(
        config: PoolConfig,
        clock: Box<dyn TimeSource>,
        backend: Box<dyn SaveBackend>,
    ) -> LivesResult<Self> {
        config.validate()?;
        let state = ResourceState::fresh(config.max_count, clock.now());
        Ok(Self {
            countdown: config.refill_period_seconds,
            tick_decay: 0.0,
            initialized: false,
            dirty: false,
            state,
            config,
            clock,
            backend,
            sinks: Vec::new(),
            cheats: None,
        })
    }

    /// Build and load in one step. A failed load is logged and the
    /// engine starts from defaults.
    pub fn open(
        config: PoolConfig,
        clock: Box<dyn TimeSource>,
        backend: Box<dyn SaveBackend>,
    ) -> LivesResult<Self> {
        let mut engine = Self::new(config, clock, backend)?;
        if let Err(e) = engine.load() {
            log::warn!("lives: starting from defaults after failed load: {e}");
        }
        Ok(engine)
    }

    pub fn with_cheat_console(mut self, console: Box<dyn CheatConsole>) -> Self {
        self.cheats = Some(console);
        self
    }

    /// Add a subscriber. Sinks are notified in subscription order.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Publish cheat presets to the console, if there is one.
    pub fn initialize(&mut self) {
        if let Some(console) = self.cheats.as_mut() {
            console.register_cheat(CheatEntry::lives());
        }
    }

    // ── Operations ─────────────────────────────────────────────

    /// Refill the pool. Returns whether anything changed.
    pub fn increase(&mut self, grant: Grant) -> bool {
        let changed = self.apply_grant(grant);
        if changed {
            self.publish();
        }
        changed
    }

    /// Spend one life. Does nothing in unlimited mode.
    ///
    /// With `restore_checkpoint_if_full`, spending from a full pool starts
    /// the refill countdown at this instant. Returns whether a life was
    /// actually taken; subscribers are notified either way.
    pub fn spend(&mut self, restore_checkpoint_if_full: bool) -> bool {
        if self.state.is_unlimited() {
            log::debug!("lives: spend suppressed in unlimited mode");
            return false;
        }

        if restore_checkpoint_if_full && self.state.is_full() {
            self.state.last_restore = self.clock.now();
            self.countdown = self.config.refill_period_seconds;
        }

        let spent = self.state.count > 0;
        self.state.count = self.state.count.saturating_sub(1);
        log::debug!("lives: spent -> {}/{}", self.state.count, self.state.max_count);

        self.publish();
        spent
    }

    /// Catch up on everything that happened since the stored checkpoints.
    pub fn reconcile(&mut self, now: Seconds) -> LivesResult<()> {
        if self.state.is_unlimited() {
            self.rebase_unlimited(now);
        } else {
            let catch_up = compute_normal_catch_up(
                self.state.last_restore,
                self.config.refill_period_seconds,
                now,
            )?;
            if catch_up.clock_skew {
                log::warn!(
                    "lives: restore checkpoint {:.3} is ahead of now {now:.3}, clamped",
                    self.state.last_restore
                );
            }

            self.state.last_restore = catch_up.checkpoint;
            if catch_up.restored > 0 {
                let added = self.state.add_clamped(catch_up.restored);
                log::debug!(
                    "lives: offline catch-up restored {added} of {} elapsed periods",
                    catch_up.restored
                );
            }
            self.countdown = catch_up.time_to_next;
        }

        if !self.initialized {
            log::info!(
                "lives: initialized at {}/{} unlimited={}",
                self.state.count,
                self.state.max_count,
                self.state.is_unlimited()
            );
        }
        self.initialized = true;
        self.publish();
        Ok(())
    }

    /// Advance the live countdowns by one frame.
    pub fn tick(&mut self, delta_seconds: Seconds) {
        if !self.initialized || delta_seconds.is_nan() || delta_seconds <= 0.0 {
            return;
        }

        if self.state.is_unlimited() {
            self.tick_decay += delta_seconds;
            if self.state.unlimited_remaining - self.tick_decay <= 0.0 {
                self.leave_unlimited(self.clock.now());
                self.publish();
            }
        } else if !self.state.is_full() {
            self.countdown -= delta_seconds;
            if self.countdown < 0.0 {
                self.state.last_restore = self.clock.now();
                self.apply_grant(Grant::Units(1));
                self.publish();
            }
        }
    }

    // ── Lifecycle reactions ────────────────────────────────────

    pub fn on_game_state_changed(&mut self, previous: GameState, current: GameState) {
        if previous.is_gameplay() && current.charges_life_on_entry() {
            log::debug!("lives: {previous:?} -> {current:?} costs a life");
            self.spend(true);
        }

        if self.initialized {
            self.state.was_active_session = current.is_gameplay();
            self.publish();
        }
    }

    pub fn on_app_pause_changed(&mut self, is_paused: bool) {
        if is_paused && self.state.is_unlimited() {
            self.state.last_restore = self.clock.now();
            self.flush();
        }
    }

    /// A trusted time signal arrived.
    pub fn on_network_time_changed(&mut self) -> LivesResult<()> {
        let now = self.clock.now();
        self.reconcile(now)
    }

    /// Reset the pool and apply a developer preset.
    pub fn apply_cheat(&mut self, preset: CheatPreset) {
        log::info!("lives: cheat {preset:?}");

        self.state.last_restore = self.clock.now();
        self.state.unlimited_remaining = 0.0;
        self.tick_decay = 0.0;
        self.state.count = 0;
        self.countdown = self.config.refill_period_seconds;

        let max = self.state.max_count;
        match preset {
            CheatPreset::None => {}
            CheatPreset::Half => {
                self.apply_grant(Grant::Units(max / 2));
            }
            CheatPreset::Full => {
                self.apply_grant(Grant::Units(max));
            }
            CheatPreset::Infinity1m | CheatPreset::Infinity5m | CheatPreset::Infinity30m => {
                if let Some(minutes) = preset.unlimited_minutes() {
                    self.apply_grant(Grant::UnlimitedMinutes(minutes));
                }
            }
        }
        self.publish();
    }

    // ── Persistence ────────────────────────────────────────────

    /// Restore saved progress. Missing fields keep their in-memory values.
    ///
    /// A failed load leaves the engine on a fresh default pool and returns
    /// the error. A record saved mid-session is charged one life unless
    /// unlimited mode is still running.
    pub fn load(&mut self) -> LivesResult<()> {
        let loaded = self
            .backend
            .load(LIVES_SAVE_KEY)
            .and_then(|record| match record {
                Some(record) => self.state.merged_with(&record).map(Some),
                None => Ok(None),
            });

        self.tick_decay = 0.0;
        self.countdown = self.config.refill_period_seconds;

        match loaded {
            Ok(Some(mut state)) => {
                state.normalize(self.config.max_count);
                log::info!(
                    "lives: loaded {}/{} unlimited={:.0}s active_session={}",
                    state.count,
                    state.max_count,
                    state.unlimited_remaining.max(0.0),
                    state.was_active_session
                );
                self.state = state;
            }
            Ok(None) => {
                log::info!("lives: no save data, starting with a full pool");
            }
            Err(e) => {
                self.state = ResourceState::fresh(self.config.max_count, self.clock.now());
                return Err(e);
            }
        }

        if self.state.was_active_session {
            self.state.was_active_session = false;
            if self.state.is_unlimited() {
                // Nothing to charge; persist the cleared flag alone.
                log::info!("lives: previous session ended mid-level in unlimited mode");
                self.flush();
            } else {
                log::info!("lives: previous session ended mid-level, charging one life");
                self.spend(false);
            }
        }
        Ok(())
    }

    /// Write the record now, returning any backend failure.
    pub fn save(&mut self) -> LivesResult<()> {
        let record = self.state.to_record()?;
        self.backend.save(LIVES_SAVE_KEY, &record)?;
        if self.dirty {
            log::info!("lives: pending save flushed");
        }
        self.dirty = false;
        Ok(())
    }

    /// The record as it would be written right now.
    pub fn save_record(&self) -> LivesResult<SaveRecord> {
        self.state.to_record()
    }

    /// Settle checkpoints for teardown and persist them.
    pub fn shutdown(&mut self) -> LivesResult<()> {
        self.initialized = false;
        if let Some(console) = self.cheats.as_mut() {
            console.unregister_cheat(LIVES_CHEAT_ID);
        }

        let now = self.clock.now();
        if self.state.is_unlimited() {
            self.rebase_unlimited(now);
        } else if self.state.was_active_session && self.state.is_full() {
            self.state.last_restore = now;
        }

        self.save()
    }

    /// Hand the backend back, e.g. to reopen it in a new engine.
    pub fn into_backend(self) -> Box<dyn SaveBackend> {
        self.backend
    }

    // ── Derived state ──────────────────────────────────────────

    pub fn current(&self) -> Lives {
        self.state.count
    }

    pub fn max(&self) -> Lives {
        self.state.max_count
    }

    pub fn is_full(&self) -> bool {
        self.state.is_full()
    }

    /// A level can be started.
    pub fn has_lives(&self) -> bool {
        self.state.count > 0 || self.state.is_unlimited()
    }

    pub fn is_unlimited(&self) -> bool {
        self.state.is_unlimited()
    }

    /// Seconds until the next life, as tracked by the live countdown.
    pub fn time_to_next(&self) -> Seconds {
        self.countdown
    }

    pub fn unlimited_remaining(&self) -> Seconds {
        (self.state.unlimited_remaining - self.tick_decay).max(0.0)
    }

    pub fn icon(&self) -> &str {
        &self.config.icon
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Last flush failed and is waiting for the next change.
    pub fn has_pending_save(&self) -> bool {
        self.dirty
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            current: self.state.count,
            max: self.state.max_count,
            is_unlimited: self.state.is_unlimited(),
        }
    }

    // ── Internals ──────────────────────────────────────────────

    fn apply_grant(&mut self, grant: Grant) -> bool {
        match grant {
            Grant::Units(amount) => {
                if amount == 0 || self.state.is_full() {
                    return false;
                }
                let added = self.state.add_clamped(u64::from(amount));
                self.countdown = self.config.refill_period_seconds;
                log::debug!(
                    "lives: +{added} -> {}/{}",
                    self.state.count,
                    self.state.max_count
                );
                true
            }
            Grant::UnlimitedMinutes(minutes) => {
                let now = self.clock.now();
                let seconds = f64::from(minutes) * 60.0;
                if self.state.is_unlimited() {
                    // Fold tick decay in first so the extension starts from
                    // the real remaining time.
                    self.rebase_unlimited(now);
                }
                if self.state.is_unlimited() {
                    self.state.unlimited_remaining += seconds;
                } else {
                    self.state.unlimited_remaining = seconds;
                    log::info!("lives: unlimited mode for {minutes}m");
                }
                self.state.unlimited_verified = now;
                self.tick_decay = 0.0;
                true
            }
        }
    }

    /// Apply analytic decay since the verification checkpoint and drop any
    /// tick-side estimate. Leaves unlimited mode if time ran out.
    fn rebase_unlimited(&mut self, now: Seconds) {
        let decay = compute_infinity_decay(self.state.unlimited_verified, now);
        if decay.clock_skew {
            log::warn!(
                "lives: unlimited checkpoint {:.3} is ahead of now {now:.3}, clamped",
                self.state.unlimited_verified
            );
        }

        self.state.unlimited_remaining -= decay.elapsed;
        self.state.unlimited_verified = decay.checkpoint;
        self.tick_decay = 0.0;

        if self.state.unlimited_remaining <= 0.0 {
            self.leave_unlimited(now);
        }
    }

    fn leave_unlimited(&mut self, now: Seconds) {
        log::info!("lives: unlimited mode ended, pool refilled");
        self.state.unlimited_remaining = 0.0;
        self.state.unlimited_verified = now;
        self.tick_decay = 0.0;
        self.state.count = self.state.max_count;
        if now > self.state.last_restore {
            self.state.last_restore = now;
        }
        self.countdown = self.config.refill_period_seconds;
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        for sink in &mut self.sinks {
            sink.notify(&snapshot);
        }
        self.flush();
    }

    fn flush(&mut self) {
        if let Err(e) = self.save() {
            log::warn!("lives: save failed, will retry on next change: {e}");
            self.dirty = true;
        }
    }
}

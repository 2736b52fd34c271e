//! Fixed-timestep scheduling.
//!
//! [`Engine`] decides *when* [`Game::tick`] runs. It is fed the current
//! time (from a [`Clock`]) and runs however many ticks are due, bounded so
//! that a long stall cannot trigger a burst of hundreds of ticks. The tick
//! interval is re-read every time, so switching slow mode takes effect on
//! the next tick without touching the anchor.

use std::thread;
use std::time::Duration;

use crate::events::TickEvents;
use crate::game::Game;
use crate::time::{Clock, ManualClock, Millis};

/// Most ticks one [`Engine::pump`] call will run.
pub const MAX_CATCH_UP_TICKS: u32 = 5;

/// Drives a [`Game`] at its configured tick rate.
#[derive(Debug)]
pub struct Engine {
    game: Game,
    next_due: Option<f64>,
    steps: u64,
}

impl Engine {
    /// Wrap a session. The first pump ticks immediately.
    #[must_use]
    pub const fn new(game: Game) -> Self {
        Self {
            game,
            next_due: None,
            steps: 0,
        }
    }

    /// Run every tick due at `now`, up to [`MAX_CATCH_UP_TICKS`].
    ///
    /// Events of all ticks run are merged in order. If the schedule is
    /// still more than the catch-up window behind afterwards, the anchor
    /// jumps to `now` and the missed ticks are dropped.
    pub fn pump(&mut self, now: Millis) -> TickEvents {
        let mut events = TickEvents::default();
        let mut due = *self.next_due.get_or_insert(now as f64);
        let mut ran = 0;

        while ran < MAX_CATCH_UP_TICKS && Self::floor(due) <= now {
            for event in self.game.tick(Self::floor(due)).events {
                events.push(event);
            }
            due += self.game.tick_interval_ms();
            ran += 1;
        }

        let interval = self.game.tick_interval_ms();
        if now as f64 - due > interval * f64::from(MAX_CATCH_UP_TICKS) {
            tracing::warn!(
                tick = self.game.tick_count(),
                behind_ms = now as f64 - due,
                "Scheduler fell behind, resetting anchor"
            );
            due = now as f64 + interval;
        }
        self.next_due = Some(due);
        self.steps += u64::from(ran);
        events
    }

    /// Advance a manual clock by exactly one tick interval and run the tick
    /// that falls due. The first call ticks at the clock's current time.
    ///
    /// Headless runs and replays drive the engine through this so that
    /// game time advances by `1000 / tps` per step.
    pub fn step(&mut self, clock: &mut ManualClock) -> TickEvents {
        if self.next_due.is_some() {
            clock.advance(self.game.tick_interval_ms());
        }
        self.pump(clock.now())
    }

    /// Real-time loop: pump, then sleep until the next tick is due, until
    /// `duration` has passed on `clock` or the game ends.
    pub fn run_for<C: Clock>(&mut self, clock: &C, duration: Millis) -> TickEvents {
        let end = clock.now().saturating_add(duration);
        let mut events = TickEvents::default();
        loop {
            let now = clock.now();
            if now >= end || self.game.is_game_over() {
                break;
            }
            for event in self.pump(now).events {
                events.push(event);
            }
            let wait = self
                .next_due
                .map_or(0.0, |due| due - clock.now() as f64)
                .clamp(0.0, (end - now) as f64);
            if wait > 0.0 {
                thread::sleep(Duration::from_secs_f64(wait / 1000.0));
            }
        }
        events
    }

    /// Ticks run through this engine, paused ones included.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// The session.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// The session, for commands.
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Hand the session back.
    #[must_use]
    pub fn into_game(self) -> Game {
        self.game
    }

    fn floor(due: f64) -> Millis {
        (due + 1e-6).floor() as Millis
    }
}

//! One-second countdowns.
//!
//! [`Countdown`] is the plain value a claim slot holds while cooling down.
//! [`CountdownHandle`] drives a countdown from a tokio task and reports every
//! tick through callbacks; dropping the handle cancels the task. [`TimerSet`]
//! keys handles by slot so that a slot never owns more than one running timer.

use std::{
    collections::HashMap,
    hash::Hash,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{
        self,
        Instant,
    },
};

pub const TICK: Duration = Duration::from_secs(1);

/// `HH:MM:SS`, hours are not wrapped at 24.
pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Countdown {
    remaining: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tick {
    Running(u64),
    Finished,
}

impl Countdown {
    pub fn new(seconds: u64) -> Self {
        Countdown { remaining: seconds }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    pub fn tick(&mut self) -> Tick {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            Tick::Finished
        } else {
            Tick::Running(self.remaining)
        }
    }

    pub fn formatted(&self) -> String {
        format_hms(self.remaining)
    }
}

/// A running countdown task. Cancelled by [`CountdownHandle::stop`] or on drop.
#[derive(Debug)]
pub struct CountdownHandle {
    task: Option<JoinHandle<()>>,
}

impl CountdownHandle {
    /// Spawns a countdown of `seconds`. `on_tick` receives the remaining
    /// seconds and their `HH:MM:SS` form after every decrement; `on_complete`
    /// runs once after the tick that reaches zero.
    pub fn start<T, C>(seconds: u64, mut on_tick: T, on_complete: C) -> Self
    where
        T: FnMut(u64, &str) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut countdown = Countdown::new(seconds);
            let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
            while !countdown.is_finished() {
                ticker.tick().await;
                countdown.tick();
                on_tick(countdown.remaining(), &countdown.formatted());
            }
            on_complete();
        });
        CountdownHandle { task: Some(task) }
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Identifies one particular timer started for a key. Events carrying a
/// token that is no longer current belong to a replaced or stopped timer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TimerToken<K> {
    pub key: K,
    generation: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerEvent<K> {
    Tick { token: TimerToken<K>, remaining: u64 },
    Completed { token: TimerToken<K> },
}

impl<K: Copy> TimerEvent<K> {
    pub fn token(&self) -> TimerToken<K> {
        match self {
            TimerEvent::Tick { token, .. } | TimerEvent::Completed { token } => *token,
        }
    }
}

#[derive(Debug)]
pub struct TimerSet<K> {
    timers: HashMap<K, (u64, CountdownHandle)>,
    generation: u64,
}

impl<K> Default for TimerSet<K> {
    fn default() -> Self {
        TimerSet {
            timers: HashMap::new(),
            generation: 0,
        }
    }
}

impl<K> TimerSet<K>
where
    K: Copy + Eq + Hash + Send + 'static,
{
    /// Starts a countdown for `key`, replacing (and cancelling) any timer the
    /// key already had. Ticks and completion are reported on `events`.
    pub fn start(
        &mut self,
        key: K,
        seconds: u64,
        events: mpsc::UnboundedSender<TimerEvent<K>>,
    ) -> TimerToken<K> {
        self.generation += 1;
        let token = TimerToken {
            key,
            generation: self.generation,
        };
        let tick_events = events.clone();
        let handle = CountdownHandle::start(
            seconds,
            move |remaining, _| {
                let _ = tick_events.send(TimerEvent::Tick { token, remaining });
            },
            move || {
                let _ = events.send(TimerEvent::Completed { token });
            },
        );
        if let Some((_, mut previous)) = self.timers.insert(key, (token.generation, handle)) {
            previous.stop();
        }
        token
    }

    /// Returns whether a timer was registered for `key`.
    pub fn stop(&mut self, key: K) -> bool {
        match self.timers.remove(&key) {
            Some((_, mut handle)) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (_, (_, mut handle)) in self.timers.drain() {
            handle.stop();
        }
    }

    pub fn is_current(&self, token: &TimerToken<K>) -> bool {
        self.timers
            .get(&token.key)
            .is_some_and(|(generation, _)| *generation == token.generation)
    }

    pub fn is_running(&self, key: K) -> bool {
        self.timers
            .get(&key)
            .is_some_and(|(_, handle)| handle.is_running())
    }

    pub fn running(&self) -> usize {
        self.timers
            .values()
            .filter(|(_, handle)| handle.is_running())
            .count()
    }
}

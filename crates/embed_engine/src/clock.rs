use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use embed_core::{Provider, TimerId};

/// Something the page does at a point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    Timer(TimerId),
    ScriptLoad(Provider),
}

/// Virtual clock and ordered queue of pending wake-ups.
///
/// Entries due at the same instant fire in the order they were scheduled.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    now: Duration,
    seq: u64,
    queue: BTreeMap<(Duration, u64), Wake>,
    timers: HashMap<TimerId, (Duration, u64)>,
}

impl TimerQueue {
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    pub(crate) fn schedule(&mut self, delay: Duration, wake: Wake) {
        self.seq += 1;
        let key = (self.now + delay, self.seq);
        if let Wake::Timer(timer_id) = wake {
            self.timers.insert(timer_id, key);
        }
        self.queue.insert(key, wake);
    }

    pub(crate) fn cancel(&mut self, timer_id: TimerId) -> bool {
        match self.timers.remove(&timer_id) {
            Some(key) => self.queue.remove(&key).is_some(),
            None => false,
        }
    }

    pub(crate) fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pops the earliest entry due at or before `until`, moving the clock to it.
    pub(crate) fn pop_due(&mut self, until: Duration) -> Option<Wake> {
        let (&key, _) = self.queue.iter().next()?;
        if key.0 > until {
            return None;
        }
        let wake = self.queue.remove(&key)?;
        if let Wake::Timer(timer_id) = wake {
            self.timers.remove(&timer_id);
        }
        self.set_now(key.0.max(self.now));
        Some(wake)
    }

    pub(crate) fn advance_to(&mut self, until: Duration) {
        if until > self.now {
            self.set_now(until);
        }
    }

    fn set_now(&mut self, now: Duration) {
        self.now = now;
        engine_logging::set_sim_time_ms(u64::try_from(now.as_millis()).unwrap_or(u64::MAX));
    }
}

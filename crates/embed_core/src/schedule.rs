use std::time::Duration;

use crate::{ContainerId, MountId, Provider};

pub type TimerId = u64;

/// Timing of the rescan schedule that follows every mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    /// Offsets from mount time at which a rescan is attempted.
    pub delays: Vec<Duration>,
    /// Time without a completion signal before the reload control appears.
    pub quiet_period: Duration,
    /// How long the reload control stays disabled after a click.
    pub reload_cooldown: Duration,
    /// Delay between a script load completing and its first rescan.
    pub post_load_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            delays: [100, 300, 700, 1_500, 3_000, 6_000, 10_000]
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
            quiet_period: Duration::from_secs(5),
            reload_cooldown: Duration::from_secs(3),
            post_load_delay: Duration::from_millis(150),
        }
    }
}

impl RetrySettings {
    /// Latest point at which a scheduled rescan can fire.
    pub fn horizon(&self) -> Duration {
        self.delays.iter().copied().max().unwrap_or_default()
    }
}

/// What an armed timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerPurpose {
    Retry {
        container: ContainerId,
        mount: MountId,
        attempt: u32,
    },
    Quiet {
        container: ContainerId,
        mount: MountId,
    },
    Cooldown {
        container: ContainerId,
        mount: MountId,
    },
    PostLoad {
        provider: Provider,
    },
}

impl TimerPurpose {
    /// Mount that owns the timer; post-load timers belong to the page.
    pub(crate) fn owner(&self) -> Option<(ContainerId, MountId)> {
        match *self {
            TimerPurpose::Retry {
                container, mount, ..
            }
            | TimerPurpose::Quiet { container, mount }
            | TimerPurpose::Cooldown { container, mount } => Some((container, mount)),
            TimerPurpose::PostLoad { .. } => None,
        }
    }
}

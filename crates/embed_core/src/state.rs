use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::schedule::TimerPurpose;
use crate::view_model::{EmbedViewModel, MountView, PostView};
use crate::{
    Effect, EnsureOutcome, Provider, ProviderSet, ReloadControl, RescanShape, RescanTarget,
    RetrySettings, ScriptRegistry, TimerId,
};

/// Host-assigned identity of a mount point in the page.
pub type ContainerId = u64;
/// Generation of a mount; a container gets a new one on every content change.
pub type MountId = u64;

/// Outcome of resolving a post URL through its oEmbed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OEmbedResult {
    Html(String),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPhase {
    /// Content had no provider markers; nothing is scheduled.
    NoEmbeds,
    /// Rescans are scheduled and markers are still unrendered.
    Pending,
    /// The host reported every marker rendered.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountSource {
    Bulk,
    OEmbed,
    StaticFallback,
    ViewLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Resolving,
    Embedded,
    Fallback,
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EmbedMount {
    pub(crate) id: MountId,
    pub(crate) source: MountSource,
    pub(crate) providers: ProviderSet,
    pub(crate) phase: MountPhase,
    pub(crate) attempts: u32,
    pub(crate) timers: BTreeSet<TimerId>,
    pub(crate) reload: ReloadControl,
    pub(crate) last_pending: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PostEmbed {
    pub(crate) url: String,
    pub(crate) status: PostStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbedState {
    settings: RetrySettings,
    registry: ScriptRegistry,
    pub(crate) mounts: BTreeMap<ContainerId, EmbedMount>,
    pub(crate) posts: BTreeMap<ContainerId, PostEmbed>,
    timers: BTreeMap<TimerId, TimerPurpose>,
    next_timer: TimerId,
    next_mount: MountId,
    dirty: bool,
}

impl EmbedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: RetrySettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    pub fn registry(&self) -> &ScriptRegistry {
        &self.registry
    }

    pub fn view(&self) -> EmbedViewModel {
        EmbedViewModel {
            mounts: self
                .mounts
                .iter()
                .map(|(container, mount)| MountView {
                    container: *container,
                    mount: mount.id,
                    source: mount.source,
                    phase: mount.phase,
                    providers: mount.providers.clone(),
                    attempts: mount.attempts,
                    reload: mount.reload,
                    last_pending: mount.last_pending,
                })
                .collect(),
            posts: self
                .posts
                .iter()
                .map(|(container, post)| PostView {
                    container: *container,
                    url: post.url.clone(),
                    status: post.status,
                })
                .collect(),
            scripts: self.registry.states(),
            armed_timers: self.timers.len(),
            dirty: self.dirty,
        }
    }

    /// Returns whether anything visible changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Drops the container's mount, cancelling every timer it owns.
    pub(crate) fn teardown(&mut self, container: ContainerId, effects: &mut Vec<Effect>) {
        let Some(mount) = self.mounts.remove(&container) else {
            return;
        };
        for timer_id in &mount.timers {
            self.timers.remove(timer_id);
            effects.push(Effect::CancelTimer {
                timer_id: *timer_id,
            });
        }
        if mount.reload != ReloadControl::Hidden {
            effects.push(Effect::ReloadControl {
                container,
                control: ReloadControl::Hidden,
            });
        }
        self.dirty = true;
    }

    /// Mounts `html` and starts the load/revive/rescan pipeline for `providers`.
    pub(crate) fn begin_mount(
        &mut self,
        container: ContainerId,
        source: MountSource,
        html: String,
        providers: ProviderSet,
        effects: &mut Vec<Effect>,
    ) {
        self.next_mount += 1;
        let id = self.next_mount;
        effects.push(Effect::MountHtml { container, html });

        let phase = if providers.is_empty() {
            MountPhase::NoEmbeds
        } else {
            MountPhase::Pending
        };
        for provider in &providers {
            if self.registry.ensure(*provider) == EnsureOutcome::Requested {
                effects.push(Effect::InjectScript {
                    provider: *provider,
                    src: provider.script_src(),
                });
            }
        }
        if phase == MountPhase::Pending || source == MountSource::OEmbed {
            effects.push(Effect::ReviveScripts { container });
        }

        self.mounts.insert(
            container,
            EmbedMount {
                id,
                source,
                providers,
                phase,
                attempts: 0,
                timers: BTreeSet::new(),
                reload: ReloadControl::Hidden,
                last_pending: None,
            },
        );
        self.dirty = true;

        if phase == MountPhase::NoEmbeds {
            return;
        }
        let delays = self.settings.delays.clone();
        for (index, delay) in delays.into_iter().enumerate() {
            let purpose = TimerPurpose::Retry {
                container,
                mount: id,
                attempt: index as u32 + 1,
            };
            self.arm(purpose, delay, effects);
        }
        let quiet = self.settings.quiet_period;
        self.arm(
            TimerPurpose::Quiet {
                container,
                mount: id,
            },
            quiet,
            effects,
        );
    }

    pub(crate) fn arm(&mut self, purpose: TimerPurpose, delay: Duration, effects: &mut Vec<Effect>) {
        self.next_timer += 1;
        let timer_id = self.next_timer;
        if let Some((container, _)) = purpose.owner() {
            if let Some(mount) = self.mounts.get_mut(&container) {
                mount.timers.insert(timer_id);
            }
        }
        self.timers.insert(timer_id, purpose);
        effects.push(Effect::ArmTimer { timer_id, delay });
    }

    /// Removes a fired timer from the bookkeeping. `None` means it was cancelled or unknown.
    pub(crate) fn take_timer(&mut self, timer_id: TimerId) -> Option<TimerPurpose> {
        let purpose = self.timers.remove(&timer_id)?;
        if let Some((container, _)) = purpose.owner() {
            if let Some(mount) = self.mounts.get_mut(&container) {
                mount.timers.remove(&timer_id);
            }
        }
        Some(purpose)
    }

    pub(crate) fn cancel_mount_timers(&mut self, container: ContainerId, effects: &mut Vec<Effect>) {
        let Some(mount) = self.mounts.get_mut(&container) else {
            return;
        };
        for timer_id in std::mem::take(&mut mount.timers) {
            self.timers.remove(&timer_id);
            effects.push(Effect::CancelTimer { timer_id });
        }
    }

    /// Looks up a live, unsettled mount by container and generation.
    pub(crate) fn pending_mount_mut(
        &mut self,
        container: ContainerId,
        mount: MountId,
    ) -> Option<&mut EmbedMount> {
        self.mounts
            .get_mut(&container)
            .filter(|m| m.id == mount && m.phase == MountPhase::Pending)
    }

    /// Rescan calls for every ready provider of the mount, followed by a pending-count probe.
    pub(crate) fn process(&self, container: ContainerId) -> Vec<Effect> {
        let Some(mount) = self.mounts.get(&container) else {
            return Vec::new();
        };
        let ready: Vec<Provider> = mount
            .providers
            .iter()
            .copied()
            .filter(|provider| self.registry.is_ready(*provider))
            .collect();
        if ready.is_empty() {
            return Vec::new();
        }
        let mut effects: Vec<Effect> = ready
            .into_iter()
            .map(|provider| Effect::Rescan {
                provider,
                target: rescan_target(provider, container),
            })
            .collect();
        effects.push(Effect::ObservePending {
            container,
            mount: mount.id,
            providers: mount.providers.clone(),
        });
        effects
    }

    /// Rescans every unsettled mount implicating `provider`.
    pub(crate) fn process_provider(&self, provider: Provider) -> Vec<Effect> {
        let targets: Vec<(ContainerId, &EmbedMount)> = self
            .mounts
            .iter()
            .filter(|(_, mount)| {
                mount.phase == MountPhase::Pending && mount.providers.contains(&provider)
            })
            .map(|(container, mount)| (*container, mount))
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if provider.rescan_shape() == RescanShape::Document {
            effects.push(Effect::Rescan {
                provider,
                target: RescanTarget::Document,
            });
        }
        for (container, mount) in targets {
            if provider.rescan_shape() == RescanShape::Subtree {
                effects.push(Effect::Rescan {
                    provider,
                    target: RescanTarget::Subtree(container),
                });
            }
            effects.push(Effect::ObservePending {
                container,
                mount: mount.id,
                providers: mount.providers.clone(),
            });
        }
        effects
    }

    pub(crate) fn mark_script_ready(&mut self, provider: Provider) -> bool {
        self.registry.mark_ready(provider)
    }
}

fn rescan_target(provider: Provider, container: ContainerId) -> RescanTarget {
    match provider.rescan_shape() {
        RescanShape::Subtree => RescanTarget::Subtree(container),
        RescanShape::Document => RescanTarget::Document,
    }
}

use engine_logging::engine_debug;

use crate::instagram::{self, FALLBACK_CAPTION};
use crate::markup;
use crate::schedule::TimerPurpose;
use crate::state::PostEmbed;
use crate::{
    ContainerId, Effect, EmbedState, MountPhase, MountSource, Msg, OEmbedResult, PostStatus,
    Provider, ReloadControl,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: EmbedState, msg: Msg) -> (EmbedState, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::ContentChanged { container, html } => {
            // Cancellations go out before the new mount arms anything.
            state.teardown(container, &mut effects);
            state.posts.remove(&container);
            // Detect on the unstripped blob so stripping never hides a provider.
            let providers = crate::detect(&html);
            let stripped = markup::strip_scripts(&html);
            state.begin_mount(container, MountSource::Bulk, stripped, providers, &mut effects);
        }
        Msg::OEmbedMounted { container, html } => {
            state.teardown(container, &mut effects);
            state.posts.remove(&container);
            let providers = crate::detect(&html);
            state.begin_mount(container, MountSource::OEmbed, html, providers, &mut effects);
        }
        Msg::PostUrlChanged { container, url } => {
            let unchanged = state
                .posts
                .get(&container)
                .is_some_and(|post| post.url == url);
            if !unchanged {
                state.teardown(container, &mut effects);
                resolve_post(&mut state, container, url, &mut effects);
            }
        }
        Msg::OEmbedResolved {
            container,
            url,
            result,
        } => {
            apply_oembed_result(&mut state, container, &url, result, &mut effects);
        }
        Msg::Unmounted { container } => {
            let mounted = state.mounts.contains_key(&container);
            state.teardown(container, &mut effects);
            let had_post = state.posts.remove(&container).is_some();
            if had_post {
                state.mark_dirty();
            }
            if mounted || had_post {
                effects.push(Effect::UnmountContainer { container });
            }
        }
        Msg::ScriptLoaded { provider } => {
            if state.mark_script_ready(provider) {
                let delay = state.settings().post_load_delay;
                state.arm(TimerPurpose::PostLoad { provider }, delay, &mut effects);
                state.mark_dirty();
            }
        }
        Msg::TimerFired { timer_id } => match state.take_timer(timer_id) {
            Some(purpose) => on_timer(&mut state, purpose, &mut effects),
            None => engine_debug!("Ignoring cancelled or unknown timer {}", timer_id),
        },
        Msg::PendingObserved {
            container,
            mount,
            pending,
        } => {
            let settled = match state.pending_mount_mut(container, mount) {
                Some(entry) => {
                    entry.last_pending = Some(pending);
                    if pending == 0 {
                        entry.phase = MountPhase::Settled;
                    }
                    pending == 0
                }
                None => return (state, effects),
            };
            if settled {
                state.cancel_mount_timers(container, &mut effects);
                set_reload(&mut state, container, ReloadControl::Hidden, &mut effects);
            }
            state.mark_dirty();
        }
        Msg::ReloadClicked { container } => {
            let enabled = state
                .mounts
                .get(&container)
                .is_some_and(|m| m.phase == MountPhase::Pending && m.reload == ReloadControl::Enabled);
            if enabled {
                effects.extend(state.process(container));
                set_reload(&mut state, container, ReloadControl::CoolingDown, &mut effects);
                if let Some(mount) = state.mounts.get(&container).map(|m| m.id) {
                    let cooldown = state.settings().reload_cooldown;
                    state.arm(TimerPurpose::Cooldown { container, mount }, cooldown, &mut effects);
                }
            }
        }
    }

    (state, effects)
}

fn on_timer(state: &mut EmbedState, purpose: TimerPurpose, effects: &mut Vec<Effect>) {
    match purpose {
        TimerPurpose::Retry {
            container,
            mount,
            attempt,
        } => {
            let Some(entry) = state.pending_mount_mut(container, mount) else {
                return;
            };
            entry.attempts = attempt;
            effects.extend(state.process(container));
            state.mark_dirty();
        }
        TimerPurpose::Quiet { container, mount } => {
            if state.pending_mount_mut(container, mount).is_some() {
                set_reload(state, container, ReloadControl::Enabled, effects);
            }
        }
        TimerPurpose::Cooldown { container, mount } => {
            let cooling = state
                .pending_mount_mut(container, mount)
                .is_some_and(|m| m.reload == ReloadControl::CoolingDown);
            if cooling {
                set_reload(state, container, ReloadControl::Enabled, effects);
            }
        }
        TimerPurpose::PostLoad { provider } => {
            effects.extend(state.process_provider(provider));
        }
    }
}

fn set_reload(
    state: &mut EmbedState,
    container: ContainerId,
    control: ReloadControl,
    effects: &mut Vec<Effect>,
) {
    let Some(mount) = state.mounts.get_mut(&container) else {
        return;
    };
    if mount.reload == control {
        return;
    }
    mount.reload = control;
    effects.push(Effect::ReloadControl { container, control });
    state.mark_dirty();
}

fn resolve_post(state: &mut EmbedState, container: ContainerId, url: String, effects: &mut Vec<Effect>) {
    if instagram::parse_post_url(&url).is_none() {
        engine_debug!("No post identifier in {}; rendering outbound link", url);
        let html = instagram::view_on_instagram_link(&url);
        state.posts.insert(
            container,
            PostEmbed {
                url,
                status: PostStatus::Unrecognized,
            },
        );
        state.begin_mount(container, MountSource::ViewLink, html, Default::default(), effects);
        return;
    }

    state.posts.insert(
        container,
        PostEmbed {
            url: url.clone(),
            status: PostStatus::Resolving,
        },
    );
    state.mark_dirty();
    effects.push(Effect::FetchOEmbed { container, url });
}

fn apply_oembed_result(
    state: &mut EmbedState,
    container: ContainerId,
    url: &str,
    result: OEmbedResult,
    effects: &mut Vec<Effect>,
) {
    let current = state
        .posts
        .get(&container)
        .is_some_and(|post| post.url == url && post.status == PostStatus::Resolving);
    if !current {
        engine_debug!("Dropping stale oEmbed result for {} in container {}", url, container);
        return;
    }

    let fetched = match result {
        OEmbedResult::Html(html) if !html.trim().is_empty() => Some(html),
        _ => None,
    };
    let (status, source, html, mut providers) = match fetched {
        Some(html) => {
            let providers = crate::detect(&html);
            (PostStatus::Embedded, MountSource::OEmbed, html, providers)
        }
        None => match instagram::parse_post_url(url) {
            Some(post) => (
                PostStatus::Fallback,
                MountSource::StaticFallback,
                instagram::static_blockquote(url, &post, FALLBACK_CAPTION),
                Default::default(),
            ),
            None => (
                PostStatus::Unrecognized,
                MountSource::ViewLink,
                instagram::view_on_instagram_link(url),
                Default::default(),
            ),
        },
    };
    if source != MountSource::ViewLink {
        providers.insert(Provider::Instagram);
    }
    if let Some(post) = state.posts.get_mut(&container) {
        post.status = status;
    }
    state.begin_mount(container, source, html, providers, effects);
}

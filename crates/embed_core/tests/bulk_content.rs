use std::sync::Once;
use std::time::Duration;

use embed_core::{
    update, Effect, EmbedState, MountPhase, MountSource, Msg, Provider, ProviderSet, TimerId,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

const TWEET_BLOB: &str = "<p>See this <blockquote class='twitter-tweet'>...</blockquote></p>";

fn mount(state: EmbedState, container: u64, html: &str) -> (EmbedState, Vec<Effect>) {
    update(
        state,
        Msg::ContentChanged {
            container,
            html: html.to_string(),
        },
    )
}

fn armed(effects: &[Effect]) -> Vec<(TimerId, Duration)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::ArmTimer { timer_id, delay } => Some((*timer_id, *delay)),
            _ => None,
        })
        .collect()
}

fn injected(effects: &[Effect]) -> Vec<Provider> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::InjectScript { provider, .. } => Some(*provider),
            _ => None,
        })
        .collect()
}

#[test]
fn tweet_blob_requests_twitter_and_schedules_rescans() {
    init_logging();
    let (mut state, effects) = mount(EmbedState::new(), 1, TWEET_BLOB);

    assert!(matches!(&effects[0], Effect::MountHtml { container: 1, html } if html.contains("twitter-tweet")));
    assert_eq!(
        effects[1],
        Effect::InjectScript {
            provider: Provider::Twitter,
            src: "https://platform.twitter.com/widgets.js",
        }
    );
    assert_eq!(effects[2], Effect::ReviveScripts { container: 1 });

    let timers = armed(&effects);
    let settings = state.settings().clone();
    assert_eq!(timers.len(), settings.delays.len() + 1);
    let retry_delays: Vec<_> = timers[..settings.delays.len()]
        .iter()
        .map(|(_, delay)| *delay)
        .collect();
    assert_eq!(retry_delays, settings.delays);
    assert_eq!(timers.last().map(|(_, d)| *d), Some(settings.quiet_period));

    let view = state.view();
    let mount = view.mount(1).unwrap();
    assert_eq!(mount.phase, MountPhase::Pending);
    assert_eq!(mount.source, MountSource::Bulk);
    assert_eq!(mount.providers, ProviderSet::from([Provider::Twitter]));
    assert!(state.consume_dirty());
}

#[test]
fn scripts_are_stripped_but_still_detected() {
    init_logging();
    let blob = concat!(
        "<blockquote class=\"twitter-tweet\"><a href=\"https://twitter.com/a/status/1\">t</a></blockquote>",
        "<script async src=\"https://platform.twitter.com/widgets.js\"></script>",
        "<script>document.title = 'owned'</script>",
    );
    let (_state, effects) = mount(EmbedState::new(), 7, blob);

    let html = match &effects[0] {
        Effect::MountHtml { html, .. } => html.clone(),
        other => panic!("expected MountHtml first, got {other:?}"),
    };
    assert!(!html.contains("<script"));
    assert!(!html.contains("owned"));
    assert!(html.contains("twitter-tweet"));
    assert_eq!(injected(&effects), vec![Provider::Twitter]);
}

#[test]
fn content_without_markers_mounts_without_pipeline() {
    init_logging();
    let (state, effects) = mount(EmbedState::new(), 1, "<p>Just words.</p>");

    assert_eq!(
        effects,
        vec![Effect::MountHtml {
            container: 1,
            html: "<p>Just words.</p>".to_string(),
        }]
    );
    let view = state.view();
    assert_eq!(view.mount(1).unwrap().phase, MountPhase::NoEmbeds);
    assert_eq!(view.armed_timers, 0);
}

#[test]
fn second_mount_does_not_inject_script_again() {
    init_logging();
    let (state, first) = mount(EmbedState::new(), 1, TWEET_BLOB);
    let (state, second) = mount(state, 2, TWEET_BLOB);
    let (_state, third) = mount(state, 1, TWEET_BLOB);

    assert_eq!(injected(&first), vec![Provider::Twitter]);
    assert!(injected(&second).is_empty());
    assert!(injected(&third).is_empty());
}

#[test]
fn mixed_blob_requests_each_provider_once() {
    init_logging();
    let blob = r#"<blockquote class="twitter-tweet"></blockquote>
        <blockquote class="instagram-media" data-instgrm-permalink="https://www.instagram.com/p/abc/"></blockquote>
        <blockquote class="tiktok-embed" cite="https://www.tiktok.com/@a/video/1"></blockquote>"#;
    let (_state, effects) = mount(EmbedState::new(), 1, blob);

    assert_eq!(
        injected(&effects),
        vec![Provider::Twitter, Provider::Instagram, Provider::TikTok]
    );
}

#[test]
fn content_change_cancels_old_timers_before_arming_new_ones() {
    init_logging();
    let (state, first) = mount(EmbedState::new(), 1, TWEET_BLOB);
    let old_timers: Vec<_> = armed(&first).into_iter().map(|(id, _)| id).collect();

    let (state, second) = mount(state, 1, TWEET_BLOB);
    let cancelled: Vec<_> = second
        .iter()
        .filter_map(|effect| match effect {
            Effect::CancelTimer { timer_id } => Some(*timer_id),
            _ => None,
        })
        .collect();
    assert_eq!(cancelled, old_timers);

    let last_cancel = second
        .iter()
        .rposition(|e| matches!(e, Effect::CancelTimer { .. }))
        .unwrap();
    let first_arm = second
        .iter()
        .position(|e| matches!(e, Effect::ArmTimer { .. }))
        .unwrap();
    assert!(last_cancel < first_arm);

    // Late-firing timers of the replaced mount do nothing.
    let mut state = state;
    for timer_id in old_timers {
        let (next, effects) = update(state, Msg::TimerFired { timer_id });
        assert!(effects.is_empty());
        state = next;
    }
}

#[test]
fn unmount_cancels_every_timer() {
    init_logging();
    let (state, effects) = mount(EmbedState::new(), 3, TWEET_BLOB);
    let (state, _) = update(
        state,
        Msg::ScriptLoaded {
            provider: Provider::Twitter,
        },
    );
    let (state, teardown) = update(state, Msg::Unmounted { container: 3 });

    let cancelled = teardown
        .iter()
        .filter(|e| matches!(e, Effect::CancelTimer { .. }))
        .count();
    assert_eq!(cancelled, armed(&effects).len());
    assert_eq!(
        teardown.last(),
        Some(&Effect::UnmountContainer { container: 3 })
    );
    assert!(state.view().mount(3).is_none());

    let mut state = state;
    for (timer_id, _) in armed(&effects) {
        let (next, fired) = update(state, Msg::TimerFired { timer_id });
        assert!(fired.is_empty(), "timer {timer_id} produced {fired:?}");
        state = next;
    }
}

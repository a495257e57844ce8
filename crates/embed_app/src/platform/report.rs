use std::collections::BTreeMap;
use std::fmt::Write as _;

use embed_core::{
    ContainerId, EmbedViewModel, LoadState, MountPhase, MountSource, MountView, PostStatus,
    ProviderSet, ReloadControl,
};
use embed_engine::{InMemoryDocument, OEmbedDocument};

/// Plain-text summary of a finished run, one block per container.
pub fn render(
    view: &EmbedViewModel,
    document: &InMemoryDocument,
    oembed: &BTreeMap<ContainerId, &OEmbedDocument>,
) -> String {
    let mut out = String::new();

    let scripts = view
        .scripts
        .iter()
        .filter(|(_, state)| *state != LoadState::Unrequested)
        .map(|(provider, state)| format!("{}={}", provider, load_label(*state)))
        .collect::<Vec<_>>();
    let _ = writeln!(
        out,
        "Scripts: {}",
        if scripts.is_empty() {
            "none".to_string()
        } else {
            scripts.join(", ")
        }
    );

    for mount in &view.mounts {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", mount_line(mount));
        if let Some(post) = view.post(mount.container) {
            let _ = writeln!(out, "  post: {} ({})", post.url, post_label(post.status));
        }
        if let Some(fetched) = oembed.get(&mount.container) {
            let _ = writeln!(out, "  oembed: {}", oembed_line(fetched));
        }
        let widgets = mount
            .providers
            .iter()
            .map(|provider| {
                let rendered = document.rendered_in(mount.container, *provider);
                format!("{}={}", provider, rendered)
            })
            .collect::<Vec<_>>();
        if !widgets.is_empty() {
            let _ = writeln!(out, "  widgets: {}", widgets.join(", "));
        }
        if let Some(html) = document.container_html(mount.container) {
            let _ = writeln!(out, "  html: {}", html);
        }
    }

    // Posts whose fetch never completed have no mount yet.
    for post in view.posts.iter().filter(|p| view.mount(p.container).is_none()) {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Container {}: {} ({})",
            post.container,
            post.url,
            post_label(post.status)
        );
    }

    out
}

fn mount_line(mount: &MountView) -> String {
    let mut line = format!(
        "Container {} [{}] {} providers={} attempts={}",
        mount.container,
        source_label(mount.source),
        phase_label(mount.phase),
        providers_label(&mount.providers),
        mount.attempts
    );
    if let Some(pending) = mount.last_pending {
        let _ = write!(line, " pending={pending}");
    }
    match mount.reload {
        ReloadControl::Hidden => {}
        ReloadControl::Enabled => line.push_str(" reload=enabled"),
        ReloadControl::CoolingDown => line.push_str(" reload=cooling-down"),
    }
    line
}

fn oembed_line(fetched: &OEmbedDocument) -> String {
    let fields = [
        ("provider", &fetched.provider_name),
        ("author", &fetched.author_name),
        ("title", &fetched.title),
        ("thumbnail", &fetched.thumbnail_url),
    ];
    let parts = fields
        .iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| format!("{label}={v}")))
        .collect::<Vec<_>>();
    if parts.is_empty() {
        "no metadata".to_string()
    } else {
        parts.join(", ")
    }
}

fn providers_label(providers: &ProviderSet) -> String {
    if providers.is_empty() {
        return "-".to_string();
    }
    providers
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join("+")
}

fn load_label(state: LoadState) -> &'static str {
    match state {
        LoadState::Unrequested => "unrequested",
        LoadState::Loading => "loading",
        LoadState::Ready => "ready",
    }
}

fn phase_label(phase: MountPhase) -> &'static str {
    match phase {
        MountPhase::NoEmbeds => "no-embeds",
        MountPhase::Pending => "pending",
        MountPhase::Settled => "settled",
    }
}

fn source_label(source: MountSource) -> &'static str {
    match source {
        MountSource::Bulk => "content",
        MountSource::OEmbed => "oembed",
        MountSource::StaticFallback => "fallback",
        MountSource::ViewLink => "link",
    }
}

fn post_label(status: PostStatus) -> &'static str {
    match status {
        PostStatus::Resolving => "resolving",
        PostStatus::Embedded => "embedded",
        PostStatus::Fallback => "fallback",
        PostStatus::Unrecognized => "unrecognized",
    }
}

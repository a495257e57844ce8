use std::collections::BTreeSet;
use std::fmt;

use url::Url;

/// Third-party widget providers whose embed markup the pipeline knows how to upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provider {
    Twitter,
    Instagram,
    TikTok,
    Facebook,
}

/// How a provider's rescan function is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescanShape {
    /// Takes the subtree to scan, e.g. `twttr.widgets.load(el)`.
    Subtree,
    /// Takes no argument and scans the whole document, e.g. `instgrm.Embeds.process()`.
    Document,
}

pub type ProviderSet = BTreeSet<Provider>;

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Twitter,
        Provider::Instagram,
        Provider::TikTok,
        Provider::Facebook,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Provider::Twitter => "twitter",
            Provider::Instagram => "instagram",
            Provider::TikTok => "tiktok",
            Provider::Facebook => "facebook",
        }
    }

    pub fn script_src(self) -> &'static str {
        match self {
            Provider::Twitter => "https://platform.twitter.com/widgets.js",
            Provider::Instagram => "https://www.instagram.com/embed.js",
            Provider::TikTok => "https://www.tiktok.com/embed.js",
            Provider::Facebook => "https://connect.facebook.net/en_US/sdk.js",
        }
    }

    /// Name of the global object the provider script installs.
    pub fn global_name(self) -> &'static str {
        match self {
            Provider::Twitter => "twttr",
            Provider::Instagram => "instgrm",
            Provider::TikTok => "tiktokEmbed",
            Provider::Facebook => "FB",
        }
    }

    pub fn rescan_shape(self) -> RescanShape {
        match self {
            Provider::Instagram => RescanShape::Document,
            Provider::Twitter | Provider::TikTok | Provider::Facebook => RescanShape::Subtree,
        }
    }

    /// CSS classes carried by this provider's not-yet-rendered embed markup.
    pub fn embed_classes(self) -> &'static [&'static str] {
        match self {
            Provider::Twitter => &["twitter-tweet", "twitter-timeline", "twitter-video"],
            Provider::Instagram => &["instagram-media"],
            Provider::TikTok => &["tiktok-embed"],
            Provider::Facebook => &["fb-post", "fb-video"],
        }
    }

    /// Lower-case substrings that implicate this provider inside a content blob.
    fn content_markers(self) -> &'static [&'static str] {
        match self {
            Provider::Twitter => &[
                "twitter-tweet",
                "twitter-timeline",
                "twitter-video",
                "platform.twitter.com",
            ],
            Provider::Instagram => &["instagram-media", "instagram.com/p/", "instagram.com/reel"],
            Provider::TikTok => &["tiktok-embed", "tiktok.com/embed"],
            Provider::Facebook => &["fb-post", "fb-video", "connect.facebook.net"],
        }
    }

    fn hosts(self) -> &'static [&'static str] {
        match self {
            Provider::Twitter => &["twitter.com", "x.com"],
            Provider::Instagram => &["instagram.com", "instagr.am"],
            Provider::TikTok => &["tiktok.com"],
            Provider::Facebook => &["facebook.com", "fb.watch"],
        }
    }

    fn matches_host(self, host: &str) -> bool {
        self.hosts()
            .iter()
            .any(|known| host == *known || host.ends_with(&format!(".{known}")))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Providers implicated by a content blob. An empty set means there is nothing to do.
pub fn detect(blob: &str) -> ProviderSet {
    let lowered = blob.to_ascii_lowercase();
    Provider::ALL
        .into_iter()
        .filter(|provider| {
            provider
                .content_markers()
                .iter()
                .any(|marker| lowered.contains(marker))
        })
        .collect()
}

/// Providers implicated by a single URL, matched on its host.
pub fn detect_url(raw: &str) -> ProviderSet {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return ProviderSet::new();
    };
    let Some(host) = parsed.host_str() else {
        return ProviderSet::new();
    };
    let host = host.to_ascii_lowercase();
    Provider::ALL
        .into_iter()
        .filter(|provider| provider.matches_host(&host))
        .collect()
}

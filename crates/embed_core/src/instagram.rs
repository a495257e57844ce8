use url::Url;

use crate::markup::{escape_attr, escape_text};

pub const FALLBACK_CAPTION: &str = "View this post on Instagram";
const EMBED_VERSION: &str = "14";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Post,
    Reel,
    Tv,
}

impl PostKind {
    fn path_segment(self) -> &'static str {
        match self {
            PostKind::Post => "p",
            PostKind::Reel => "reel",
            PostKind::Tv => "tv",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_ascii_lowercase().as_str() {
            "p" => Some(PostKind::Post),
            "reel" | "reels" => Some(PostKind::Reel),
            "tv" => Some(PostKind::Tv),
            _ => None,
        }
    }
}

/// A public Instagram post identified by its shortcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstagramPost {
    pub kind: PostKind,
    pub shortcode: String,
}

impl InstagramPost {
    pub fn permalink(&self) -> String {
        format!(
            "https://www.instagram.com/{}/{}/",
            self.kind.path_segment(),
            self.shortcode
        )
    }
}

/// Extracts the post identifier from a public post URL.
///
/// Accepts `/p/{code}`, `/reel/{code}`, `/reels/{code}` and `/tv/{code}`,
/// optionally preceded by a username segment.
pub fn parse_post_url(raw: &str) -> Option<InstagramPost> {
    let parsed = Url::parse(raw.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host != "instagram.com" && host != "instagr.am" {
        return None;
    }

    let segments: Vec<&str> = parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();
    let (kind, shortcode) = match segments.as_slice() {
        [kind, code, ..] if PostKind::from_segment(kind).is_some() => (kind, code),
        [_user, kind, code, ..] => (kind, code),
        _ => return None,
    };
    let kind = PostKind::from_segment(kind)?;
    if !is_shortcode(shortcode) {
        return None;
    }
    Some(InstagramPost {
        kind,
        shortcode: (*shortcode).to_string(),
    })
}

fn is_shortcode(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Blockquote form the Instagram script upgrades client-side.
pub fn static_blockquote(url: &str, post: &InstagramPost, caption: &str) -> String {
    format!(
        concat!(
            "<blockquote class=\"instagram-media\" data-instgrm-permalink=\"{permalink}\" ",
            "data-instgrm-version=\"{version}\">",
            "<a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\">{caption}</a>",
            "</blockquote>"
        ),
        permalink = escape_attr(&post.permalink()),
        version = EMBED_VERSION,
        href = escape_attr(url),
        caption = escape_text(caption),
    )
}

/// Outbound link rendered when no embed can be built for the URL.
pub fn view_on_instagram_link(url: &str) -> String {
    format!(
        concat!(
            "<p class=\"embed-unavailable\">Unable to load embed. ",
            "<a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\">View on Instagram</a>",
            "</p>"
        ),
        href = escape_attr(url),
    )
}

#[cfg(test)]
mod tests {
    use super::{parse_post_url, static_blockquote, PostKind, FALLBACK_CAPTION};

    #[test]
    fn parses_post_reel_and_user_prefixed_urls() {
        let post = parse_post_url("https://www.instagram.com/p/CxYz_12-a/").unwrap();
        assert_eq!(post.kind, PostKind::Post);
        assert_eq!(post.shortcode, "CxYz_12-a");

        let reel = parse_post_url("https://instagram.com/reels/Abc123?igsh=xyz").unwrap();
        assert_eq!(reel.kind, PostKind::Reel);
        assert_eq!(reel.permalink(), "https://www.instagram.com/reel/Abc123/");

        let prefixed = parse_post_url("https://www.instagram.com/someone/p/Q1w2/").unwrap();
        assert_eq!(prefixed.shortcode, "Q1w2");
    }

    #[test]
    fn rejects_profiles_and_foreign_hosts() {
        assert!(parse_post_url("https://www.instagram.com/someone/").is_none());
        assert!(parse_post_url("https://www.instagram.com/p/").is_none());
        assert!(parse_post_url("https://example.com/p/abc/").is_none());
        assert!(parse_post_url("ftp://instagram.com/p/abc/").is_none());
        assert!(parse_post_url("instagram.com/p/abc").is_none());
    }

    #[test]
    fn blockquote_carries_permalink_and_caption() {
        let url = "https://www.instagram.com/p/abc/?a=1&b=2";
        let post = parse_post_url(url).unwrap();
        let html = static_blockquote(url, &post, FALLBACK_CAPTION);
        assert!(html.starts_with("<blockquote class=\"instagram-media\""));
        assert!(html.contains("data-instgrm-permalink=\"https://www.instagram.com/p/abc/\""));
        assert!(html.contains("href=\"https://www.instagram.com/p/abc/?a=1&amp;b=2\""));
        assert!(html.contains(FALLBACK_CAPTION));
    }
}

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use embed_core::{ContainerId, Msg};
use embed_engine::{EmbedEngine, ReqwestOEmbedFetcher};
use engine_logging::{engine_info, engine_warn};

use super::report;
use super::settings::AppSettings;

const CONTENT_CONTAINER: ContainerId = 1;

/// One simulated page: an optional CMS article plus standalone Instagram posts.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub content_html: Option<String>,
    pub post_urls: Vec<String>,
    /// Simulated time to run after mounting; defaults to the retry horizon.
    pub horizon: Option<Duration>,
}

pub fn run_page(settings: &AppSettings, request: PageRequest) -> anyhow::Result<String> {
    let fetcher = Arc::new(ReqwestOEmbedFetcher::new(settings.oembed.clone()));
    let mut engine = EmbedEngine::new(settings.document(), fetcher, settings.retry.clone())
        .context("failed to start embed engine")?;

    if let Some(html) = request.content_html {
        engine.dispatch(Msg::ContentChanged {
            container: CONTENT_CONTAINER,
            html,
        });
    }
    for (index, url) in request.post_urls.into_iter().enumerate() {
        let container = CONTENT_CONTAINER + 1 + index as ContainerId;
        engine.dispatch(Msg::PostUrlChanged { container, url });
    }

    if engine.outstanding_fetches() > 0 {
        let budget = settings.oembed.connect_timeout + settings.oembed.request_timeout;
        if !engine.wait_for_fetches(budget) {
            engine_warn!(
                "{} oEmbed fetches still outstanding after {:?}",
                engine.outstanding_fetches(),
                budget
            );
        }
    }

    let horizon = request.horizon.unwrap_or_else(|| default_horizon(settings));
    engine_info!("Running page for {:?} of simulated time", horizon);
    engine.advance(horizon);

    Ok(report::render(
        &engine.view(),
        engine.document(),
        &engine.oembed_documents(),
    ))
}

fn default_horizon(settings: &AppSettings) -> Duration {
    let retry = &settings.retry;
    retry.horizon().max(retry.quiet_period) + retry.post_load_delay + Duration::from_secs(1)
}

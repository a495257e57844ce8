use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use embed_core::{
    update, ContainerId, Effect, EmbedState, EmbedViewModel, Msg, OEmbedResult, PostStatus,
    RetrySettings,
};
use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::clock::{TimerQueue, Wake};
use crate::worker::{FetchCompletion, FetchHandle};
use crate::{DocumentHost, EngineError, OEmbedDocument, OEmbedFetcher, ScriptLoad};

/// Drives the embed state machine against a document on a single event queue.
///
/// Messages are applied one at a time; effects run in the order `update`
/// returned them. Timer callbacks, script load completions and oEmbed
/// completions all enter through [`EmbedEngine::dispatch`].
pub struct EmbedEngine<D: DocumentHost> {
    state: EmbedState,
    document: D,
    clock: TimerQueue,
    fetches: FetchHandle,
    outstanding_fetches: usize,
    fetched: BTreeMap<(ContainerId, String), OEmbedDocument>,
    effect_log: Vec<Effect>,
}

impl<D: DocumentHost> EmbedEngine<D> {
    pub fn new(
        document: D,
        fetcher: Arc<dyn OEmbedFetcher>,
        settings: RetrySettings,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            state: EmbedState::with_settings(settings),
            document,
            clock: TimerQueue::default(),
            fetches: FetchHandle::new(fetcher)?,
            outstanding_fetches: 0,
            fetched: BTreeMap::new(),
            effect_log: Vec::new(),
        })
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                if let Some(follow_up) = self.apply(&effect) {
                    inbox.push_back(follow_up);
                }
                self.effect_log.push(effect);
            }
        }
    }

    /// Moves simulated time forward, firing every timer and script load due on the way.
    pub fn advance(&mut self, by: Duration) {
        let until = self.clock.now() + by;
        loop {
            self.poll_fetches();
            match self.clock.pop_due(until) {
                Some(wake) => self.wake(wake),
                None => break,
            }
        }
        self.clock.advance_to(until);
    }

    /// Dispatches every oEmbed completion that has already arrived.
    pub fn poll_fetches(&mut self) {
        while let Some(done) = self.fetches.try_recv() {
            self.complete_fetch(done);
        }
    }

    /// Blocks until all requested fetches completed. Returns false on timeout.
    pub fn wait_for_fetches(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.outstanding_fetches > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.fetches.recv_timeout(remaining) {
                Some(done) => self.complete_fetch(done),
                None => return false,
            }
        }
        true
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Time of the next scheduled timer or script load, if any.
    pub fn next_due(&self) -> Option<Duration> {
        self.clock.next_due()
    }

    pub fn scheduled(&self) -> usize {
        self.clock.pending()
    }

    pub fn outstanding_fetches(&self) -> usize {
        self.outstanding_fetches
    }

    pub fn state(&self) -> &EmbedState {
        &self.state
    }

    pub fn view(&self) -> EmbedViewModel {
        self.state.view()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn effect_log(&self) -> &[Effect] {
        &self.effect_log
    }

    /// oEmbed responses currently rendered, keyed by post container.
    pub fn oembed_documents(&self) -> BTreeMap<ContainerId, &OEmbedDocument> {
        self.state
            .view()
            .posts
            .into_iter()
            .filter(|post| post.status == PostStatus::Embedded)
            .filter_map(|post| {
                let document = self.fetched.get(&(post.container, post.url))?;
                Some((post.container, document))
            })
            .collect()
    }

    fn wake(&mut self, wake: Wake) {
        match wake {
            Wake::Timer(timer_id) => self.dispatch(Msg::TimerFired { timer_id }),
            Wake::ScriptLoad(provider) => {
                engine_info!("Script for {} loaded", provider);
                self.document.complete_script_load(provider);
                self.dispatch(Msg::ScriptLoaded { provider });
            }
        }
    }

    fn complete_fetch(&mut self, done: FetchCompletion) {
        self.outstanding_fetches = self.outstanding_fetches.saturating_sub(1);
        let result = match done.result {
            Ok(document) => {
                engine_info!(
                    "oEmbed for {} resolved: provider={:?} author={:?} title={:?}",
                    done.url,
                    document.provider_name,
                    document.author_name,
                    document.title
                );
                let html = document.html.clone();
                self.fetched
                    .insert((done.container, done.url.clone()), document);
                OEmbedResult::Html(html)
            }
            Err(err) => {
                engine_warn!("oEmbed fetch for {} failed: {}", done.url, err);
                OEmbedResult::Failed
            }
        };
        self.dispatch(Msg::OEmbedResolved {
            container: done.container,
            url: done.url,
            result,
        });
    }

    fn apply(&mut self, effect: &Effect) -> Option<Msg> {
        match effect {
            Effect::MountHtml { container, html } => {
                engine_debug!("Mounting {} bytes into container {}", html.len(), container);
                self.document.mount_html(*container, html);
            }
            Effect::InjectScript { provider, src } => {
                engine_info!("Injecting {} script {}", provider, src);
                match self.document.inject_script(*provider, src) {
                    ScriptLoad::CompletesAfter(latency) => {
                        self.clock.schedule(latency, Wake::ScriptLoad(*provider));
                    }
                    ScriptLoad::Fails => {
                        engine_warn!("Script for {} failed to load", provider);
                    }
                }
            }
            Effect::ReviveScripts { container } => {
                match self.document.revive_scripts(*container) {
                    Ok(count) => engine_debug!("Revived {} scripts in container {}", count, container),
                    Err(err) => engine_warn!("Script revival skipped: {}", err),
                }
            }
            Effect::Rescan { provider, target } => {
                match self.document.rescan(*provider, *target) {
                    Ok(upgraded) => {
                        engine_debug!("Rescan {} {:?} upgraded {}", provider, target, upgraded)
                    }
                    Err(err) => engine_warn!("Rescan {} {:?} failed: {}", provider, target, err),
                }
            }
            Effect::ObservePending {
                container,
                mount,
                providers,
            } => match self.document.pending_markers(*container, providers) {
                Ok(pending) => {
                    return Some(Msg::PendingObserved {
                        container: *container,
                        mount: *mount,
                        pending,
                    });
                }
                Err(err) => engine_warn!("Pending count unavailable: {}", err),
            },
            Effect::ArmTimer { timer_id, delay } => {
                self.clock.schedule(*delay, Wake::Timer(*timer_id));
            }
            Effect::CancelTimer { timer_id } => {
                self.clock.cancel(*timer_id);
            }
            Effect::FetchOEmbed { container, url } => {
                engine_info!("Fetching oEmbed for {} (container {})", url, container);
                self.outstanding_fetches += 1;
                self.fetches.request(*container, url.clone());
            }
            Effect::ReloadControl { container, control } => {
                self.document.set_reload_control(*container, *control);
            }
            Effect::UnmountContainer { container } => {
                engine_debug!("Detaching container {}", container);
                self.document.unmount_container(*container);
                self.fetched.retain(|(owner, _), _| owner != container);
            }
        }
        None
    }
}

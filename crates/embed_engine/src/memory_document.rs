use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use embed_core::markup::{ElementNode, Fragment};
use embed_core::{ContainerId, Provider, ProviderSet, ReloadControl, RescanTarget};
use engine_logging::{engine_debug, engine_trace};

use crate::{DocumentHost, HostError, ScriptLoad};

const RENDERED_ATTR: &str = "data-embed-rendered";
const DEFAULT_SCRIPT_LATENCY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedScript {
    pub provider: Provider,
    pub src: String,
}

/// One script that ran after revival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptExecution {
    pub container: ContainerId,
    pub attrs: Vec<(String, String)>,
    pub text: String,
}

impl ScriptExecution {
    pub fn src(&self) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("src"))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescanCall {
    pub provider: Provider,
    pub target: RescanTarget,
    pub upgraded: usize,
}

/// Page model with browser semantics the embed pipeline relies on:
/// bulk-injected scripts are inert, provider globals appear only after their
/// script loads, and rescans upgrade each marker at most once.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocument {
    containers: BTreeMap<ContainerId, Fragment>,
    body_scripts: Vec<InjectedScript>,
    globals: BTreeSet<Provider>,
    behaviors: BTreeMap<Provider, ScriptLoad>,
    default_latency: Option<Duration>,
    executions: Vec<ScriptExecution>,
    rescans: Vec<RescanCall>,
    widgets: BTreeMap<Provider, usize>,
    reload_controls: BTreeMap<ContainerId, ReloadControl>,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script_load(mut self, provider: Provider, load: ScriptLoad) -> Self {
        self.behaviors.insert(provider, load);
        self
    }

    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = Some(latency);
        self
    }

    pub fn container_html(&self, container: ContainerId) -> Option<String> {
        self.containers.get(&container).map(Fragment::to_html)
    }

    /// Number of script elements in the body referencing the provider's script.
    pub fn script_elements(&self, provider: Provider) -> usize {
        self.body_scripts
            .iter()
            .filter(|script| script.src == provider.script_src())
            .count()
    }

    pub fn injected_scripts(&self) -> &[InjectedScript] {
        &self.body_scripts
    }

    pub fn has_global(&self, provider: Provider) -> bool {
        self.globals.contains(&provider)
    }

    pub fn executions(&self) -> &[ScriptExecution] {
        &self.executions
    }

    pub fn rescans(&self) -> &[RescanCall] {
        &self.rescans
    }

    /// Rendered widget instances created for the provider so far.
    pub fn widget_count(&self, provider: Provider) -> usize {
        self.widgets.get(&provider).copied().unwrap_or(0)
    }

    /// Markers in one container that the provider has rendered.
    pub fn rendered_in(&self, container: ContainerId, provider: Provider) -> usize {
        let Some(fragment) = self.containers.get(&container) else {
            return 0;
        };
        let mut rendered = 0;
        fragment.visit_elements(&mut |element| {
            if element.attr(RENDERED_ATTR) == Some(provider.name()) {
                rendered += 1;
            }
        });
        rendered
    }

    pub fn reload_control(&self, container: ContainerId) -> ReloadControl {
        self.reload_controls
            .get(&container)
            .copied()
            .unwrap_or_default()
    }

    fn upgrade_markers(fragment: &mut Fragment, provider: Provider) -> usize {
        let mut upgraded = 0;
        fragment.visit_elements_mut(&mut |element| {
            let Some(class) = marker_class(element, provider) else {
                return;
            };
            if element.attr(RENDERED_ATTR).is_some() {
                return;
            }
            element.set_attr(RENDERED_ATTR, provider.name());
            element.add_class(&format!("{class}-rendered"));
            upgraded += 1;
        });
        upgraded
    }
}

fn marker_class(element: &ElementNode, provider: Provider) -> Option<&'static str> {
    provider
        .embed_classes()
        .iter()
        .copied()
        .find(|class| element.has_class(class))
}

impl DocumentHost for InMemoryDocument {
    fn mount_html(&mut self, container: ContainerId, html: &str) {
        self.containers.insert(container, Fragment::parse(html));
    }

    fn inject_script(&mut self, provider: Provider, src: &str) -> ScriptLoad {
        self.body_scripts.push(InjectedScript {
            provider,
            src: src.to_string(),
        });
        self.behaviors.get(&provider).copied().unwrap_or_else(|| {
            ScriptLoad::CompletesAfter(self.default_latency.unwrap_or(DEFAULT_SCRIPT_LATENCY))
        })
    }

    fn complete_script_load(&mut self, provider: Provider) {
        engine_debug!("Global {} installed", provider.global_name());
        self.globals.insert(provider);
    }

    fn revive_scripts(&mut self, container: ContainerId) -> Result<usize, HostError> {
        let fragment = self
            .containers
            .get_mut(&container)
            .ok_or(HostError::UnknownContainer(container))?;

        let mut ran = Vec::new();
        fragment.visit_elements_mut(&mut |element| {
            if !element.is("script") || element.started {
                return;
            }
            // Swap in a freshly created element; inserting it runs the payload.
            let mut fresh = ElementNode::new(element.name.clone());
            fresh.attrs = element.attrs.clone();
            fresh.children = element.children.clone();
            *element = fresh;
            element.started = true;
            ran.push(ScriptExecution {
                container,
                attrs: element.attrs.clone(),
                text: element.text(),
            });
        });

        let count = ran.len();
        for execution in &ran {
            engine_trace!(
                "Executed script src={:?} text_len={} in container {}",
                execution.src(),
                execution.text.len(),
                container
            );
        }
        self.executions.extend(ran);
        Ok(count)
    }

    fn rescan(&mut self, provider: Provider, target: RescanTarget) -> Result<usize, HostError> {
        if !self.globals.contains(&provider) {
            return Err(HostError::ProviderUnavailable(provider));
        }
        let upgraded = match target {
            RescanTarget::Subtree(container) => {
                let fragment = self
                    .containers
                    .get_mut(&container)
                    .ok_or(HostError::UnknownContainer(container))?;
                Self::upgrade_markers(fragment, provider)
            }
            RescanTarget::Document => self
                .containers
                .values_mut()
                .map(|fragment| Self::upgrade_markers(fragment, provider))
                .sum(),
        };
        *self.widgets.entry(provider).or_default() += upgraded;
        self.rescans.push(RescanCall {
            provider,
            target,
            upgraded,
        });
        Ok(upgraded)
    }

    fn pending_markers(
        &self,
        container: ContainerId,
        providers: &ProviderSet,
    ) -> Result<usize, HostError> {
        let fragment = self
            .containers
            .get(&container)
            .ok_or(HostError::UnknownContainer(container))?;
        let mut pending = 0;
        fragment.visit_elements(&mut |element| {
            let is_marker = providers
                .iter()
                .any(|provider| marker_class(element, *provider).is_some());
            if is_marker && element.attr(RENDERED_ATTR).is_none() {
                pending += 1;
            }
        });
        Ok(pending)
    }

    fn set_reload_control(&mut self, container: ContainerId, control: ReloadControl) {
        self.reload_controls.insert(container, control);
    }

    fn unmount_container(&mut self, container: ContainerId) {
        self.containers.remove(&container);
        self.reload_controls.remove(&container);
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryDocument;
    use crate::{DocumentHost, HostError};
    use embed_core::{Provider, ProviderSet, ReloadControl, RescanTarget};

    const TWEETS: &str = concat!(
        "<blockquote class=\"twitter-tweet\">a</blockquote>",
        "<div><blockquote class=\"twitter-tweet\">b</blockquote></div>",
    );

    #[test]
    fn rescan_without_global_is_an_error() {
        let mut doc = InMemoryDocument::new();
        doc.mount_html(1, TWEETS);
        assert_eq!(
            doc.rescan(Provider::Twitter, RescanTarget::Subtree(1)),
            Err(HostError::ProviderUnavailable(Provider::Twitter))
        );
    }

    #[test]
    fn repeated_rescans_upgrade_each_marker_once() {
        let mut doc = InMemoryDocument::new();
        doc.mount_html(1, TWEETS);
        doc.complete_script_load(Provider::Twitter);

        assert_eq!(doc.rescan(Provider::Twitter, RescanTarget::Subtree(1)), Ok(2));
        assert_eq!(doc.rescan(Provider::Twitter, RescanTarget::Subtree(1)), Ok(0));
        assert_eq!(doc.rescan(Provider::Twitter, RescanTarget::Document), Ok(0));
        assert_eq!(doc.widget_count(Provider::Twitter), 2);

        let providers = ProviderSet::from([Provider::Twitter]);
        assert_eq!(doc.pending_markers(1, &providers), Ok(0));
        assert!(doc
            .container_html(1)
            .unwrap()
            .contains("twitter-tweet twitter-tweet-rendered"));
    }

    #[test]
    fn revive_runs_each_inert_script_once_in_order() {
        let mut doc = InMemoryDocument::new();
        doc.mount_html(
            2,
            "<script>first()</script><p><script src=\"https://cdn.example/x.js\" async></script></p><script>third()</script>",
        );
        assert_eq!(doc.revive_scripts(2), Ok(3));
        assert_eq!(doc.revive_scripts(2), Ok(0));

        let runs = doc.executions();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].text, "first()");
        assert_eq!(runs[1].src(), Some("https://cdn.example/x.js"));
        assert!(runs[1].attrs.iter().any(|(key, _)| key == "async"));
        assert_eq!(runs[2].text, "third()");
    }

    #[test]
    fn remount_makes_scripts_inert_again() {
        let mut doc = InMemoryDocument::new();
        doc.mount_html(2, "<script>boot()</script>");
        doc.revive_scripts(2).unwrap();
        doc.mount_html(2, "<script>boot()</script>");
        assert_eq!(doc.revive_scripts(2), Ok(1));
        assert_eq!(doc.executions().len(), 2);
    }

    #[test]
    fn unmounted_container_is_out_of_reach() {
        let mut doc = InMemoryDocument::new();
        doc.mount_html(1, "<blockquote class=\"instagram-media\">a</blockquote>");
        doc.mount_html(2, "<blockquote class=\"instagram-media\">b</blockquote>");
        doc.set_reload_control(1, ReloadControl::Enabled);
        doc.complete_script_load(Provider::Instagram);

        doc.unmount_container(1);
        assert_eq!(doc.rescan(Provider::Instagram, RescanTarget::Document), Ok(1));
        assert_eq!(doc.container_html(1), None);
        assert_eq!(doc.reload_control(1), ReloadControl::Hidden);
        assert_eq!(doc.rendered_in(2, Provider::Instagram), 1);
        assert_eq!(doc.rendered_in(1, Provider::Instagram), 0);
    }

    #[test]
    fn unknown_container_is_reported() {
        let mut doc = InMemoryDocument::new();
        assert_eq!(doc.revive_scripts(5), Err(HostError::UnknownContainer(5)));
        assert_eq!(
            doc.pending_markers(5, &ProviderSet::new()),
            Err(HostError::UnknownContainer(5))
        );
    }
}

use std::time::Duration;

use embed_core::{ContainerId, Provider, ProviderSet, ReloadControl, RescanTarget};

use crate::HostError;

/// What happens to an injected provider script element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptLoad {
    /// The element's load event fires after the given latency.
    CompletesAfter(Duration),
    /// The network load fails; no event is ever observed.
    Fails,
}

/// The page the pipeline renders into.
///
/// A browser binding implements this against the live DOM and provider
/// globals; [`crate::InMemoryDocument`] models the same behaviour for tests
/// and the command-line driver.
pub trait DocumentHost {
    /// Replaces the container's children by bulk HTML injection (scripts stay inert).
    fn mount_html(&mut self, container: ContainerId, html: &str);

    /// Appends a script element for the provider to the document body.
    fn inject_script(&mut self, provider: Provider, src: &str) -> ScriptLoad;

    /// Called when an injected script's load completes; installs the provider global.
    fn complete_script_load(&mut self, provider: Provider);

    /// Re-creates inert script elements in the container so they run, in
    /// document order. Returns how many executed.
    fn revive_scripts(&mut self, container: ContainerId) -> Result<usize, HostError>;

    /// Invokes the provider's rescan function. Returns how many markers it upgraded.
    fn rescan(&mut self, provider: Provider, target: RescanTarget) -> Result<usize, HostError>;

    /// Counts the providers' markers in the container that are not rendered yet.
    fn pending_markers(
        &self,
        container: ContainerId,
        providers: &ProviderSet,
    ) -> Result<usize, HostError>;

    fn set_reload_control(&mut self, container: ContainerId, control: ReloadControl);

    /// Removes the container and everything mounted in it from the page.
    fn unmount_container(&mut self, container: ContainerId);
}

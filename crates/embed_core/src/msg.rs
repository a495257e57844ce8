use crate::{ContainerId, MountId, Provider, TimerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// New CMS content for a container, replacing whatever it showed.
    ContentChanged { container: ContainerId, html: String },
    /// Already-fetched oEmbed markup to render in a container.
    OEmbedMounted { container: ContainerId, html: String },
    /// A post URL was assigned to a container (new embed or changed prop).
    PostUrlChanged { container: ContainerId, url: String },
    /// The oEmbed fetch for a container finished.
    OEmbedResolved {
        container: ContainerId,
        url: String,
        result: crate::OEmbedResult,
    },
    /// The container left the page.
    Unmounted { container: ContainerId },
    /// A provider script finished loading and its global is usable.
    ScriptLoaded { provider: Provider },
    /// A timer armed through `Effect::ArmTimer` elapsed.
    TimerFired { timer_id: TimerId },
    /// Unrendered provider markers counted after a rescan.
    PendingObserved {
        container: ContainerId,
        mount: MountId,
        pending: usize,
    },
    /// User clicked the "reload embeds" control.
    ReloadClicked { container: ContainerId },
}

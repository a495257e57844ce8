use std::time::Duration;

use crate::{ContainerId, MountId, Provider, ProviderSet, TimerId};

/// Side effects requested by [`crate::update`], executed in order by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace the container's children with `html` via bulk injection.
    MountHtml { container: ContainerId, html: String },
    /// Append one script element for the provider to the document body.
    InjectScript {
        provider: Provider,
        src: &'static str,
    },
    /// Re-create the container's inert script elements so they execute.
    ReviveScripts { container: ContainerId },
    /// Call the provider's rescan function.
    Rescan {
        provider: Provider,
        target: RescanTarget,
    },
    /// Count the mount's provider markers that are not rendered yet and
    /// report back with [`crate::Msg::PendingObserved`].
    ObservePending {
        container: ContainerId,
        mount: MountId,
        providers: ProviderSet,
    },
    ArmTimer { timer_id: TimerId, delay: Duration },
    CancelTimer { timer_id: TimerId },
    /// Resolve a post URL through the provider's oEmbed endpoint and report
    /// back with [`crate::Msg::OEmbedResolved`].
    FetchOEmbed { container: ContainerId, url: String },
    ReloadControl {
        container: ContainerId,
        control: ReloadControl,
    },
    /// Detach the container from the page; later rescans must not reach it.
    UnmountContainer { container: ContainerId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescanTarget {
    Subtree(ContainerId),
    Document,
}

/// The manual "reload embeds" affordance of a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadControl {
    #[default]
    Hidden,
    Enabled,
    CoolingDown,
}

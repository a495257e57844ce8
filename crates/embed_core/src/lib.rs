//! Embed core: pure state machine for rendering third-party embeds in injected content.
mod effect;
pub mod instagram;
pub mod markup;
mod msg;
mod provider;
mod registry;
mod schedule;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, ReloadControl, RescanTarget};
pub use msg::Msg;
pub use provider::{detect, detect_url, Provider, ProviderSet, RescanShape};
pub use registry::{EnsureOutcome, LoadState, ScriptRegistry};
pub use schedule::{RetrySettings, TimerId};
pub use state::{
    ContainerId, EmbedState, MountId, MountPhase, MountSource, OEmbedResult, PostStatus,
};
pub use update::update;
pub use view_model::{EmbedViewModel, MountView, PostView};

use crate::{
    ContainerId, LoadState, MountId, MountPhase, MountSource, PostStatus, Provider, ProviderSet,
    ReloadControl,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmbedViewModel {
    pub mounts: Vec<MountView>,
    pub posts: Vec<PostView>,
    pub scripts: Vec<(Provider, LoadState)>,
    pub armed_timers: usize,
    pub dirty: bool,
}

impl EmbedViewModel {
    pub fn mount(&self, container: ContainerId) -> Option<&MountView> {
        self.mounts.iter().find(|m| m.container == container)
    }

    pub fn post(&self, container: ContainerId) -> Option<&PostView> {
        self.posts.iter().find(|p| p.container == container)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountView {
    pub container: ContainerId,
    pub mount: MountId,
    pub source: MountSource,
    pub phase: MountPhase,
    pub providers: ProviderSet,
    pub attempts: u32,
    pub reload: ReloadControl,
    pub last_pending: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostView {
    pub container: ContainerId,
    pub url: String,
    pub status: PostStatus,
}

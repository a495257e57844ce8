use std::collections::BTreeMap;

use crate::Provider;

/// Page-lifetime load state of one provider's widget script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LoadState {
    #[default]
    Unrequested,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// First request: the caller must inject the script element.
    Requested,
    /// Another caller's load is in flight.
    InFlight,
    /// The provider global is usable already.
    AlreadyReady,
}

/// Process-wide script bookkeeping shared by every mount.
///
/// States only move forward; `ensure` is the single place where
/// `Unrequested -> Loading` happens, so only its first caller injects a script.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptRegistry {
    states: BTreeMap<Provider, LoadState>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, provider: Provider) -> LoadState {
        self.states.get(&provider).copied().unwrap_or_default()
    }

    pub fn is_ready(&self, provider: Provider) -> bool {
        self.state(provider) == LoadState::Ready
    }

    pub fn ensure(&mut self, provider: Provider) -> EnsureOutcome {
        match self.state(provider) {
            LoadState::Ready => EnsureOutcome::AlreadyReady,
            LoadState::Loading => EnsureOutcome::InFlight,
            LoadState::Unrequested => {
                self.states.insert(provider, LoadState::Loading);
                EnsureOutcome::Requested
            }
        }
    }

    /// Records that the provider global appeared. Returns false if it was ready already.
    pub fn mark_ready(&mut self, provider: Provider) -> bool {
        let previous = self.states.insert(provider, LoadState::Ready);
        previous != Some(LoadState::Ready)
    }

    pub fn states(&self) -> Vec<(Provider, LoadState)> {
        Provider::ALL
            .into_iter()
            .map(|provider| (provider, self.state(provider)))
            .collect()
    }
}

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use embed_core::ContainerId;

use crate::{EngineError, OEmbedDocument, OEmbedError, OEmbedFetcher};

enum FetchCommand {
    Resolve { container: ContainerId, url: String },
}

/// A finished oEmbed fetch, delivered back to the engine's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCompletion {
    pub container: ContainerId,
    pub url: String,
    pub result: Result<OEmbedDocument, OEmbedError>,
}

/// Runs oEmbed fetches on a background tokio runtime.
///
/// Requests never block the caller; completions are picked up with
/// [`FetchHandle::try_recv`] or [`FetchHandle::recv_timeout`].
pub struct FetchHandle {
    cmd_tx: mpsc::Sender<FetchCommand>,
    event_rx: mpsc::Receiver<FetchCompletion>,
}

impl FetchHandle {
    pub fn new(fetcher: Arc<dyn OEmbedFetcher>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::Builder::new()
            .name("oembed-fetch".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let fetcher = fetcher.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(fetcher.as_ref(), command, event_tx).await;
                    });
                }
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn request(&self, container: ContainerId, url: impl Into<String>) {
        let _ = self.cmd_tx.send(FetchCommand::Resolve {
            container,
            url: url.into(),
        });
    }

    pub fn try_recv(&self) -> Option<FetchCompletion> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchCompletion> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    fetcher: &dyn OEmbedFetcher,
    command: FetchCommand,
    event_tx: mpsc::Sender<FetchCompletion>,
) {
    match command {
        FetchCommand::Resolve { container, url } => {
            let result = fetcher.fetch(&url).await;
            let _ = event_tx.send(FetchCompletion {
                container,
                url,
                result,
            });
        }
    }
}

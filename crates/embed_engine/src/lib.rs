//! Embed engine: page model, effect execution and oEmbed IO.
mod clock;
mod document;
mod engine;
mod memory_document;
mod oembed;
mod types;
mod worker;

pub use document::{DocumentHost, ScriptLoad};
pub use engine::EmbedEngine;
pub use memory_document::{InMemoryDocument, InjectedScript, RescanCall, ScriptExecution};
pub use oembed::{OEmbedFetcher, OEmbedSettings, ReqwestOEmbedFetcher, INSTAGRAM_OEMBED_ENDPOINT};
pub use types::{EngineError, FailureKind, HostError, OEmbedDocument, OEmbedError};
pub use worker::{FetchCompletion, FetchHandle};

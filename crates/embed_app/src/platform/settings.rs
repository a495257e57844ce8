use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use embed_core::{Provider, RetrySettings};
use embed_engine::{InMemoryDocument, OEmbedSettings, ScriptLoad};
use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PersistedRetry {
    delays_ms: Vec<u64>,
    quiet_period_ms: u64,
    reload_cooldown_ms: u64,
    post_load_delay_ms: u64,
}

impl Default for PersistedRetry {
    fn default() -> Self {
        let defaults = RetrySettings::default();
        Self {
            delays_ms: defaults.delays.iter().map(millis).collect(),
            quiet_period_ms: millis(&defaults.quiet_period),
            reload_cooldown_ms: millis(&defaults.reload_cooldown),
            post_load_delay_ms: millis(&defaults.post_load_delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PersistedOEmbed {
    endpoint: String,
    access_token: Option<String>,
    connect_timeout_ms: u64,
    request_timeout_ms: u64,
    max_bytes: u64,
}

impl Default for PersistedOEmbed {
    fn default() -> Self {
        let defaults = OEmbedSettings::default();
        Self {
            endpoint: defaults.endpoint,
            access_token: defaults.access_token,
            connect_timeout_ms: millis(&defaults.connect_timeout),
            request_timeout_ms: millis(&defaults.request_timeout),
            max_bytes: defaults.max_bytes,
        }
    }
}

/// Simulated load behaviour of one provider script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum PersistedScriptLoad {
    LatencyMs(u64),
    Fails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
struct PersistedSettings {
    retry: PersistedRetry,
    oembed: PersistedOEmbed,
    default_script_latency_ms: Option<u64>,
    /// Keyed by provider name, e.g. `"twitter"`.
    scripts: BTreeMap<String, PersistedScriptLoad>,
}

/// Everything the driver needs to build an engine run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AppSettings {
    pub(crate) retry: RetrySettings,
    pub(crate) oembed: OEmbedSettings,
    pub(crate) default_script_latency: Option<Duration>,
    pub(crate) scripts: Vec<(Provider, ScriptLoad)>,
}

impl Default for AppSettings {
    fn default() -> Self {
        PersistedSettings::default().into()
    }
}

impl AppSettings {
    pub(crate) fn document(&self) -> InMemoryDocument {
        let mut document = InMemoryDocument::new();
        if let Some(latency) = self.default_script_latency {
            document = document.with_default_latency(latency);
        }
        for (provider, load) in &self.scripts {
            document = document.with_script_load(*provider, *load);
        }
        document
    }
}

impl From<PersistedSettings> for AppSettings {
    fn from(persisted: PersistedSettings) -> Self {
        let retry = RetrySettings {
            delays: persisted
                .retry
                .delays_ms
                .into_iter()
                .map(Duration::from_millis)
                .collect(),
            quiet_period: Duration::from_millis(persisted.retry.quiet_period_ms),
            reload_cooldown: Duration::from_millis(persisted.retry.reload_cooldown_ms),
            post_load_delay: Duration::from_millis(persisted.retry.post_load_delay_ms),
        };
        let oembed = OEmbedSettings {
            endpoint: persisted.oembed.endpoint,
            access_token: persisted.oembed.access_token,
            connect_timeout: Duration::from_millis(persisted.oembed.connect_timeout_ms),
            request_timeout: Duration::from_millis(persisted.oembed.request_timeout_ms),
            max_bytes: persisted.oembed.max_bytes,
        };
        let mut scripts = Vec::new();
        for (name, load) in persisted.scripts {
            let Some(provider) = provider_named(&name) else {
                engine_warn!("Ignoring script settings for unknown provider {:?}", name);
                continue;
            };
            let load = match load {
                PersistedScriptLoad::LatencyMs(ms) => {
                    ScriptLoad::CompletesAfter(Duration::from_millis(ms))
                }
                PersistedScriptLoad::Fails => ScriptLoad::Fails,
            };
            scripts.push((provider, load));
        }
        Self {
            retry,
            oembed,
            default_script_latency: persisted.default_script_latency_ms.map(Duration::from_millis),
            scripts,
        }
    }
}

/// Reads settings from a RON file. Missing or broken files fall back to defaults.
pub(crate) fn load_settings(path: &Path) -> AppSettings {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            engine_warn!("Settings file {:?} not found; using defaults", path);
            return AppSettings::default();
        }
        Err(err) => {
            engine_warn!("Failed to read settings from {:?}: {}", path, err);
            return AppSettings::default();
        }
    };

    let persisted: PersistedSettings = match ron::from_str(&content) {
        Ok(settings) => settings,
        Err(err) => {
            engine_warn!("Failed to parse settings from {:?}: {}", path, err);
            return AppSettings::default();
        }
    };

    engine_info!("Loaded settings from {:?}", path);
    persisted.into()
}

fn provider_named(name: &str) -> Option<Provider> {
    Provider::ALL
        .into_iter()
        .find(|provider| provider.name().eq_ignore_ascii_case(name.trim()))
}

fn millis(duration: &Duration) -> u64 {
    duration.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(&dir.path().join("absent.ron"));
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.retry, RetrySettings::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        fs::write(
            &path,
            r#"(
                retry: (delays_ms: [50, 500], quiet_period_ms: 2000),
                oembed: (access_token: Some("app|token")),
                scripts: {"tiktok": Fails, "Twitter": LatencyMs(40)},
            )"#,
        )
        .unwrap();

        let settings = load_settings(&path);
        assert_eq!(
            settings.retry.delays,
            vec![Duration::from_millis(50), Duration::from_millis(500)]
        );
        assert_eq!(settings.retry.quiet_period, Duration::from_secs(2));
        assert_eq!(
            settings.retry.reload_cooldown,
            RetrySettings::default().reload_cooldown
        );
        assert_eq!(settings.oembed.access_token.as_deref(), Some("app|token"));
        assert_eq!(settings.oembed.endpoint, OEmbedSettings::default().endpoint);
        assert!(settings.scripts.contains(&(Provider::TikTok, ScriptLoad::Fails)));
        assert!(settings.scripts.contains(&(
            Provider::Twitter,
            ScriptLoad::CompletesAfter(Duration::from_millis(40))
        )));
    }

    #[test]
    fn unparsable_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        fs::write(&path, "retry: [this is not ron").unwrap();
        assert_eq!(load_settings(&path), AppSettings::default());
    }

    #[test]
    fn unknown_provider_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        fs::write(&path, r#"(scripts: {"myspace": Fails})"#).unwrap();
        assert!(load_settings(&path).scripts.is_empty());
    }
}

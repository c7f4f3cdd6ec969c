//! Security settings for protected indices.

use serde::{Deserialize, Serialize};
use tracing::error;

use super::error::{SecurityError, SecurityResult};
use super::field_spec::FieldVisibilitySpec;

/// Filtering is opt-in.
pub const DEFAULT_ENABLED: bool = false;

/// Requests without a context are rejected unless configured otherwise.
pub const DEFAULT_ABSENT_CONTEXT: AbsentContextPolicy = AbsentContextPolicy::FailClosed;

/// Filtered views report context-scoped cache keys by default.
pub const DEFAULT_CACHE_KEY_MODE: CacheKeyMode = CacheKeyMode::Composite;

/// Key of the settings object read by [`IndexSettings::from_json`].
pub const SETTINGS_KEY: &str = "docshield";

/// What to do when filtering is enabled but a request carries no context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentContextPolicy {
    /// Serve the segment unfiltered and log a warning.
    FailOpen,
    /// Fail the request with [`SecurityError::ContextMissing`].
    FailClosed,
}

/// Cache identity reported by filtered views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyMode {
    /// Scope the inner reader's keys with the context fingerprint.
    Composite,
    /// Report the inner reader's keys unchanged.
    ///
    /// Only safe when no cache above the reader outlives a single context.
    Passthrough,
}

/// Engine-wide filtering switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Whether filtering is active at all.
    pub enabled: bool,
    /// Behaviour for requests without a context.
    pub absent_context: AbsentContextPolicy,
    /// Cache identity of filtered views.
    pub cache_key_mode: CacheKeyMode,
}

impl SecurityConfig {
    /// Configuration with filtering turned on and default policies.
    pub fn enabled() -> Self {
        Self::default().with_enabled(true)
    }

    /// Turn filtering on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the absent-context policy.
    pub fn with_absent_context(mut self, policy: AbsentContextPolicy) -> Self {
        self.absent_context = policy;
        self
    }

    /// Set the cache key mode.
    pub fn with_cache_key_mode(mut self, mode: CacheKeyMode) -> Self {
        self.cache_key_mode = mode;
        self
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            absent_context: DEFAULT_ABSENT_CONTEXT,
            cache_key_mode: DEFAULT_CACHE_KEY_MODE,
        }
    }
}

/// Per-index security settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSettings {
    /// Filtering switches.
    pub security: SecurityConfig,
    /// Fields visible in this index. `None` exposes every field, and so does
    /// an empty spec.
    pub fields: Option<FieldVisibilitySpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    enable: Option<bool>,
    absent_context: Option<AbsentContextPolicy>,
    cache_key: Option<CacheKeyMode>,
    fields: Option<FieldVisibilitySpec>,
}

impl IndexSettings {
    /// Settings for an index with filtering turned on.
    pub fn protected() -> Self {
        Self {
            security: SecurityConfig::enabled(),
            fields: None,
        }
    }

    /// Set the filtering switches.
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Restrict the index to the fields selected by `spec`.
    pub fn with_fields(mut self, spec: FieldVisibilitySpec) -> Self {
        self.fields = Some(spec).filter(|spec| !spec.is_empty());
        self
    }

    /// Parse host index settings.
    ///
    /// Reads the `"docshield"` object of a JSON settings document, e.g.
    ///
    /// ```json
    /// {"docshield": {"enable": true, "absent_context": "fail_open",
    ///                "cache_key": "composite", "fields": ["title", "~secret"]}}
    /// ```
    ///
    /// Missing keys take their defaults; a document without the object
    /// yields default settings.
    pub fn from_json(text: &str) -> SecurityResult<Self> {
        let mut document: serde_json::Value = serde_json::from_str(text).map_err(|e| {
            error!(error = %e, "index settings are not valid JSON");
            SecurityError::Configuration(format!("invalid settings document: {e}"))
        })?;

        let section = match document.get_mut(SETTINGS_KEY) {
            Some(section) => section.take(),
            None => return Ok(Self::default()),
        };

        let raw: RawSettings = serde_json::from_value(section).map_err(|e| {
            error!(error = %e, "invalid {} settings", SETTINGS_KEY);
            SecurityError::Configuration(format!("invalid {SETTINGS_KEY} settings: {e}"))
        })?;

        let defaults = SecurityConfig::default();
        Ok(Self {
            security: SecurityConfig {
                enabled: raw.enable.unwrap_or(defaults.enabled),
                absent_context: raw.absent_context.unwrap_or(defaults.absent_context),
                cache_key_mode: raw.cache_key.unwrap_or(defaults.cache_key_mode),
            },
            fields: raw.fields.filter(|spec| !spec.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SecurityConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.absent_context, AbsentContextPolicy::FailClosed);
        assert_eq!(config.cache_key_mode, CacheKeyMode::Composite);
    }

    #[test]
    fn test_config_builder() {
        let config = SecurityConfig::enabled()
            .with_absent_context(AbsentContextPolicy::FailOpen)
            .with_cache_key_mode(CacheKeyMode::Passthrough);

        assert!(config.enabled);
        assert_eq!(config.absent_context, AbsentContextPolicy::FailOpen);
        assert_eq!(config.cache_key_mode, CacheKeyMode::Passthrough);
    }

    #[test]
    fn test_from_json() {
        let settings = IndexSettings::from_json(
            r#"{"docshield":{"enable":true,"absent_context":"fail_open","fields":["title","~secret"]}}"#,
        )
        .unwrap();

        assert!(settings.security.enabled);
        assert_eq!(settings.security.absent_context, AbsentContextPolicy::FailOpen);
        assert_eq!(settings.security.cache_key_mode, CacheKeyMode::Composite);
        assert_eq!(
            settings.fields,
            Some(FieldVisibilitySpec::new(["title", "~secret"]))
        );
    }

    #[test]
    fn test_empty_fields_disable_field_filtering() {
        for fields in ["[]", r#"["", "~"]"#] {
            let settings =
                IndexSettings::from_json(&format!(r#"{{"docshield":{{"enable":true,"fields":{fields}}}}}"#)).unwrap();
            assert!(settings.security.enabled);
            assert_eq!(settings.fields, None, "fields {fields}");
        }
        assert_eq!(IndexSettings::protected().with_fields(FieldVisibilitySpec::default()).fields, None);
    }

    #[test]
    fn test_from_json_without_section() {
        let settings = IndexSettings::from_json(r#"{"number_of_shards":1}"#).unwrap();
        assert_eq!(settings, IndexSettings::default());
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        for bad in [
            "not json",
            r#"{"docshield":{"enable":"yes"}}"#,
            r#"{"docshield":{"absent_context":"sometimes"}}"#,
            r#"{"docshield":{"enabled":true}}"#,
        ] {
            assert!(
                matches!(IndexSettings::from_json(bad), Err(SecurityError::Configuration(_))),
                "expected configuration error for {bad}"
            );
        }
    }
}

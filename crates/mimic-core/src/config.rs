//! Repository configuration
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! default_preset = "strict"
//! save_generated_code = true
//! module_directory = "target/mimic"
//! ```

use mimic_behavior::{Preset, PresetParseError};
use mimic_proxy::ScopeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Malformed TOML or unknown values
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Unknown preset name
    #[error(transparent)]
    Preset(#[from] PresetParseError),

    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Mock repository configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Preset used when a request names none
    pub default_preset: Preset,
    /// Whether generated modules may be saved
    pub save_generated_code: bool,
    /// Refuse to use the signed namespace
    pub disable_signed_module: bool,
    /// Directory saved modules go to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_directory: Option<PathBuf>,
    /// Name of the signed generation namespace
    pub signed_module_name: String,
    /// Name of the unsigned generation namespace
    pub unsigned_module_name: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        let scope = ScopeOptions::default();
        Self {
            default_preset: Preset::RecursiveLoose,
            save_generated_code: false,
            disable_signed_module: false,
            module_directory: None,
            signed_module_name: scope.signed_module_name,
            unsigned_module_name: scope.unsigned_module_name,
        }
    }
}

impl MockConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed input
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// I/O or parse failures
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Preset used when a request names none
    #[inline]
    #[must_use]
    pub fn with_default_preset(mut self, preset: Preset) -> Self {
        self.default_preset = preset;
        self
    }

    /// With default preset given by name
    ///
    /// # Errors
    /// Returns [`ConfigError::Preset`] for unknown names
    pub fn with_default_preset_named(self, name: &str) -> Result<Self, ConfigError> {
        Ok(self.with_default_preset(name.parse()?))
    }

    /// Allow saving generated modules
    #[inline]
    #[must_use]
    pub fn with_save_generated_code(mut self, save: bool) -> Self {
        self.save_generated_code = save;
        self
    }

    /// Refuse (or allow) the signed namespace
    #[inline]
    #[must_use]
    pub fn with_signed_module_disabled(mut self, disabled: bool) -> Self {
        self.disable_signed_module = disabled;
        self
    }

    /// Directory generated modules are saved to
    #[inline]
    #[must_use]
    pub fn with_module_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.module_directory = Some(directory.into());
        self
    }

    /// Options for the repository's generation scope
    #[must_use]
    pub fn scope_options(&self) -> ScopeOptions {
        let options = ScopeOptions::default()
            .with_save_generated_code(self.save_generated_code)
            .with_signed_module_disabled(self.disable_signed_module)
            .with_module_names(self.signed_module_name.clone(), self.unsigned_module_name.clone());
        match &self.module_directory {
            Some(dir) => options.with_directory(dir.clone()),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn defaults() {
        let config = MockConfig::default();
        assert_eq!(config.default_preset, Preset::RecursiveLoose);
        assert!(!config.save_generated_code);
        assert_eq!(config.scope_options().signed_module_name, config.signed_module_name);
    }

    #[test]
    fn parses_partial_toml() {
        let config = MockConfig::from_toml_str(
            r#"
            default_preset = "strict"
            save_generated_code = true
            module_directory = "out"
            "#,
        )
        .unwrap();
        assert_eq!(config.default_preset, Preset::Strict);
        assert!(config.save_generated_code);
        assert_eq!(config.scope_options().directory, Some(PathBuf::from("out")));
        assert!(!config.disable_signed_module);
    }

    #[test]
    fn rejects_unknown_preset() {
        assert!(matches!(
            MockConfig::from_toml_str("default_preset = \"lenient\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            MockConfig::new().with_default_preset_named("lenient"),
            Err(ConfigError::Preset(_))
        ));
    }

    #[test]
    fn preset_spellings_match_the_builder() {
        for name in ["RecursiveLoose", "call-original", "STRICT", "loose"] {
            let from_toml = MockConfig::from_toml_str(&format!("default_preset = \"{name}\""))
                .unwrap()
                .default_preset;
            let from_name = MockConfig::new()
                .with_default_preset_named(name)
                .unwrap()
                .default_preset;
            assert_eq!(from_toml, from_name, "{name}");
        }
        let text = toml::to_string(&MockConfig::new()).unwrap();
        assert!(text.contains("default_preset = \"recursive_loose\""));
    }

    #[test]
    fn toml_roundtrip() {
        let config = MockConfig::new()
            .with_default_preset(Preset::CallOriginal)
            .with_signed_module_disabled(true);
        let text = toml::to_string(&config).unwrap();
        assert_eq!(MockConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mimic.toml");
        std::fs::write(&path, "default_preset = \"loose\"\n").unwrap();
        assert_eq!(MockConfig::from_file(&path).unwrap().default_preset, Preset::Loose);
        assert!(matches!(
            MockConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    proptest! {
        #[test]
        fn any_config_survives_toml(
            preset in prop::sample::select(Preset::ALL.to_vec()),
            save in any::<bool>(),
            disabled in any::<bool>(),
            dir in proptest::option::of("[a-z]{1,8}"),
        ) {
            let mut config = MockConfig::new()
                .with_default_preset(preset)
                .with_save_generated_code(save)
                .with_signed_module_disabled(disabled);
            if let Some(dir) = dir {
                config = config.with_module_directory(dir);
            }
            let text = toml::to_string(&config).unwrap();
            prop_assert_eq!(MockConfig::from_toml_str(&text).unwrap(), config);
        }
    }
}

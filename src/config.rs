//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--theme`, `--no-diagnostics`, etc.)
//! 2. `$VISTREE_CONFIG` environment variable (path to config file)
//! 3. Project-local `.vistree.toml` in the current working directory
//! 4. Global `~/.config/vistree/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Path of the diagnostic log file (disabled when unset).
    pub log_file: Option<String>,
    /// Run diagnostic providers (the `d` key and the findings panel).
    pub diagnostics: Option<bool>,
}

/// Tree panel settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    /// Expand every context root on startup.
    pub expand_roots: Option<bool>,
    /// Show resource type suffixes in leaf labels.
    pub show_types: Option<bool>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_bg: Option<String>,
    pub tree_fg: Option<String>,
    pub tree_selected_bg: Option<String>,
    pub tree_selected_fg: Option<String>,
    pub tree_dictionary_fg: Option<String>,
    pub tree_resource_fg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub tree: TreeConfig,
    pub theme: ThemeConfig,
}

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path — that is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. $VISTREE_CONFIG environment variable
    if let Ok(env_path) = std::env::var("VISTREE_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. Project-local `.vistree.toml` in CWD
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".vistree.toml"));
    }

    // 3. Global `~/.config/vistree/config.toml`
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("vistree").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning printed to stderr).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!(
                "Warning: failed to parse config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

impl AppConfig {
    /// Merge `other` on top of `self` — `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                log_file: other.general.log_file.clone().or(self.general.log_file),
                diagnostics: other.general.diagnostics.or(self.general.diagnostics),
            },
            tree: TreeConfig {
                expand_roots: other.tree.expand_roots.or(self.tree.expand_roots),
                show_types: other.tree.show_types.or(self.tree.show_types),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        // Start with built-in defaults (all None — the struct Default).
        let mut config = AppConfig::default();

        // Load from candidate files (lowest priority first so higher overwrites).
        let paths = candidate_paths();
        // Walk in reverse so that highest-priority (env var) overwrites lower.
        for path in paths.iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        // Explicit --config file has higher priority than candidates.
        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        // CLI flag overrides are highest priority.
        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    /// Path of the diagnostic log file, if logging is enabled.
    pub fn log_file(&self) -> Option<&str> {
        self.general.log_file.as_deref()
    }

    /// Whether diagnostic providers are enabled.
    pub fn diagnostics_enabled(&self) -> bool {
        self.general.diagnostics.unwrap_or(true)
    }

    /// Whether every context root starts expanded.
    pub fn expand_roots(&self) -> bool {
        self.tree.expand_roots.unwrap_or(true)
    }

    /// Whether resource leaves show their type suffix.
    pub fn show_types(&self) -> bool {
        self.tree.show_types.unwrap_or(true)
    }

    /// Theme scheme: "dark", "light", or "custom".
    pub fn theme_scheme(&self) -> &str {
        self.theme.scheme.as_deref().unwrap_or("dark")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.log_file(), None);
        assert_eq!(cfg.diagnostics_enabled(), true);
        assert_eq!(cfg.expand_roots(), true);
        assert_eq!(cfg.show_types(), true);
        assert_eq!(cfg.theme_scheme(), "dark");
    }

    #[test]
    fn test_toml_parsing_full() {
        let toml = r#"
[general]
log_file = "/tmp/vistree.log"
diagnostics = false

[tree]
expand_roots = false
show_types = false

[theme]
scheme = "light"
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.log_file(), Some("/tmp/vistree.log"));
        assert_eq!(cfg.diagnostics_enabled(), false);
        assert_eq!(cfg.expand_roots(), false);
        assert_eq!(cfg.show_types(), false);
        assert_eq!(cfg.theme_scheme(), "light");
    }

    #[test]
    fn test_toml_parsing_partial() {
        let toml = r#"
[general]
diagnostics = false
"#;
        let cfg: AppConfig = toml::from_str(toml).expect("parse failed");
        assert_eq!(cfg.diagnostics_enabled(), false);
        // Everything else should be defaults
        assert_eq!(cfg.expand_roots(), true);
        assert_eq!(cfg.theme_scheme(), "dark");
    }

    #[test]
    fn test_toml_parsing_empty() {
        let cfg: AppConfig = toml::from_str("").expect("parse failed");
        assert_eq!(cfg.diagnostics_enabled(), true);
        assert_eq!(cfg.log_file(), None);
    }

    #[test]
    fn test_merge_overrides() {
        let base = AppConfig {
            general: GeneralConfig {
                log_file: Some("/tmp/base.log".into()),
                diagnostics: Some(true),
            },
            tree: TreeConfig {
                expand_roots: Some(false),
                show_types: Some(true),
            },
            ..Default::default()
        };

        let over = AppConfig {
            general: GeneralConfig {
                diagnostics: Some(false),
                // log_file not set — should keep base
                ..Default::default()
            },
            tree: TreeConfig {
                expand_roots: Some(true),
                // show_types not set — should keep base
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(&over);
        assert_eq!(merged.diagnostics_enabled(), false); // overridden
        assert_eq!(merged.log_file(), Some("/tmp/base.log")); // from base
        assert_eq!(merged.expand_roots(), true); // overridden
        assert_eq!(merged.show_types(), true); // from base
    }

    #[test]
    fn test_merge_none_does_not_clear_some() {
        let base = AppConfig {
            tree: TreeConfig {
                expand_roots: Some(false),
                show_types: Some(false),
            },
            ..Default::default()
        };
        let over = AppConfig::default(); // all None

        let merged = base.merge(&over);
        assert_eq!(merged.expand_roots(), false); // base preserved
        assert_eq!(merged.show_types(), false); // base preserved
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("test-config.toml");
        let mut f = std::fs::File::create(&cfg_path).expect("create");
        writeln!(
            f,
            r#"
[general]
diagnostics = false

[theme]
scheme = "light"
"#
        )
        .expect("write");

        let cfg = load_file(&cfg_path).expect("load");
        assert_eq!(cfg.diagnostics_enabled(), false);
        assert_eq!(cfg.theme_scheme(), "light");
        // Unset fields fall through to defaults
        assert_eq!(cfg.expand_roots(), true);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("bad.toml");
        std::fs::write(&cfg_path, "this is { not valid toml").expect("write");
        let result = load_file(&cfg_path);
        assert!(result.is_none());
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg_path = dir.path().join("config.toml");
        std::fs::write(
            &cfg_path,
            r#"
[general]
log_file = "/tmp/file.log"

[theme]
scheme = "light"
"#,
        )
        .expect("write");

        let cli_overrides = AppConfig {
            theme: ThemeConfig {
                scheme: Some("dark".into()),
                custom: None,
            },
            ..Default::default()
        };

        let cfg = AppConfig::load(Some(&cfg_path), Some(&cli_overrides));
        // CLI override wins
        assert_eq!(cfg.theme_scheme(), "dark");
        // File value preserved (not overridden by CLI)
        assert_eq!(cfg.log_file(), Some("/tmp/file.log"));
    }

    #[test]
    fn test_theme_custom_colors() {
        let toml = r##"
[theme]
scheme = "custom"

[theme.custom]
tree_bg = "#1a1b26"
tree_fg = "#c0caf5"
border_fg = "#565f89"
"##;
        let cfg: AppConfig = toml::from_str(toml).expect("parse");
        assert_eq!(cfg.theme_scheme(), "custom");
        let custom = cfg.theme.custom.as_ref().expect("custom present");
        assert_eq!(custom.tree_bg.as_deref(), Some("#1a1b26"));
        assert_eq!(custom.tree_fg.as_deref(), Some("#c0caf5"));
        assert_eq!(custom.border_fg.as_deref(), Some("#565f89"));
        // Unset custom colors are None
        assert!(custom.status_bg.is_none());
    }
}

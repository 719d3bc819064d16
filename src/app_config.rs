//! Application configuration loading and precedence resolution.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use article_fetch::mirror::{
    ConfigError, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS, MirrorConfig,
};

/// Environment variable consulted for the mirror base URL.
pub const MIRROR_URL_ENV: &str = "ARTICLE_FETCH_MIRROR_URL";

/// Flat `key = value` file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Mirror base URL.
    pub mirror_url: Option<String>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Default directory for documents and challenge files.
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Validates config values against CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(url) = &self.mirror_url
            && url.trim().is_empty()
        {
            bail!("Invalid config value for `mirror_url`: must not be empty");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    fn file(&self) -> Option<&FileConfig> {
        self.config.as_ref()
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/article-fetch/config.toml`
/// 2. `$HOME/.config/article-fetch/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("article-fetch")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("article-fetch")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = load_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "mirror_url" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `mirror_url` value on line {line_no}"))?;
                cfg.mirror_url = Some(parsed);
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `connect_timeout_secs` value on line {line_no}")
                })?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            "read_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!("Invalid `read_timeout_secs` value on line {line_no}")
                })?;
                cfg.read_timeout_secs = Some(parsed);
            }
            "output_dir" => {
                let parsed = parse_string_literal(value)
                    .with_context(|| format!("Invalid `output_dir` value on line {line_no}"))?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    let Some(inner) = raw_value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        bail!("Expected double-quoted string");
    };
    Ok(inner.to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

/// Where an effective setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    /// Command-line flag.
    Flag,
    /// Environment variable.
    Env,
    /// Config file.
    File,
    /// Built-in default.
    Default,
}

impl fmt::Display for SettingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::File => "config file",
            Self::Default => "default",
        };
        f.write_str(label)
    }
}

/// A resolved value and its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T> {
    /// The effective value.
    pub value: T,
    /// Where it came from.
    pub source: SettingSource,
}

impl<T> Sourced<T> {
    fn new(value: T, source: SettingSource) -> Self {
        Self { value, source }
    }
}

/// Command-line overrides fed into resolution.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--mirror-url`
    pub mirror_url: Option<String>,
    /// `--connect-timeout`
    pub connect_timeout_secs: Option<u64>,
    /// `--read-timeout`
    pub read_timeout_secs: Option<u64>,
    /// `-o/--output-dir`
    pub output_dir: Option<PathBuf>,
}

/// The effective settings after applying flag > env > file > default.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Mirror base URL, if any source set one.
    pub mirror_url: Option<Sourced<String>>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Sourced<u64>,
    /// Request timeout in seconds.
    pub read_timeout_secs: Sourced<u64>,
    /// Output directory.
    pub output_dir: Sourced<PathBuf>,
    /// Config file path consulted, whether or not it existed.
    pub config_path: Option<PathBuf>,
    /// Whether the config file existed and was read.
    pub loaded_from_file: bool,
}

impl Settings {
    /// Resolves effective settings.
    ///
    /// `env_mirror_url` is the value of [`MIRROR_URL_ENV`]; blank values are
    /// treated as unset.
    #[must_use]
    pub fn resolve(
        cli: CliOverrides,
        env_mirror_url: Option<String>,
        loaded: &LoadedConfig,
    ) -> Self {
        let file = loaded.file();

        let mirror_url = non_blank(cli.mirror_url)
            .map(|url| Sourced::new(url, SettingSource::Flag))
            .or_else(|| non_blank(env_mirror_url).map(|url| Sourced::new(url, SettingSource::Env)))
            .or_else(|| {
                file.and_then(|f| non_blank(f.mirror_url.clone()))
                    .map(|url| Sourced::new(url, SettingSource::File))
            });

        let connect_timeout_secs = pick(
            cli.connect_timeout_secs,
            file.and_then(|f| f.connect_timeout_secs),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        );
        let read_timeout_secs = pick(
            cli.read_timeout_secs,
            file.and_then(|f| f.read_timeout_secs),
            DEFAULT_READ_TIMEOUT_SECS,
        );
        let output_dir = pick(
            cli.output_dir,
            file.and_then(|f| f.output_dir.clone()),
            PathBuf::from("."),
        );

        Self {
            mirror_url,
            connect_timeout_secs,
            read_timeout_secs,
            output_dir,
            config_path: loaded.path.clone(),
            loaded_from_file: loaded.config.is_some(),
        }
    }

    /// Builds the mirror configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingMirrorUrl`] when no source set a mirror
    /// URL, and any validation error from [`MirrorConfig`].
    pub fn mirror_config(&self) -> Result<MirrorConfig, ConfigError> {
        let Some(url) = &self.mirror_url else {
            return Err(ConfigError::MissingMirrorUrl);
        };
        MirrorConfig::new(url.value.clone())?.with_timeouts(
            Duration::from_secs(self.connect_timeout_secs.value),
            Duration::from_secs(self.read_timeout_secs.value),
        )
    }

    /// Renders the settings for the `config` subcommand.
    #[must_use]
    pub fn render(&self) -> String {
        let config_file = match (&self.config_path, self.loaded_from_file) {
            (Some(path), true) => format!("{} (loaded)", path.display()),
            (Some(path), false) => format!("{} (not found)", path.display()),
            (None, _) => "(no config directory)".to_string(),
        };
        let mirror_url = match &self.mirror_url {
            Some(url) => format!("{} [{}]", url.value, url.source),
            None => format!("(not set; use --mirror-url, {MIRROR_URL_ENV} or the config file)"),
        };
        format!(
            "config_file = {config_file}\n\
             mirror_url = {mirror_url}\n\
             connect_timeout_secs = {} [{}]\n\
             read_timeout_secs = {} [{}]\n\
             output_dir = {} [{}]",
            self.connect_timeout_secs.value,
            self.connect_timeout_secs.source,
            self.read_timeout_secs.value,
            self.read_timeout_secs.source,
            self.output_dir.value.display(),
            self.output_dir.source,
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn pick<T>(flag: Option<T>, file: Option<T>, default: T) -> Sourced<T> {
    if let Some(value) = flag {
        Sourced::new(value, SettingSource::Flag)
    } else if let Some(value) = file {
        Sourced::new(value, SettingSource::File)
    } else {
        Sourced::new(default, SettingSource::Default)
    }
}

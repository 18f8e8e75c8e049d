//! Run-time settings
//!
//! Every value is looked up once at startup with the precedence
//! environment variable > key-value file > interactive prompt > default,
//! and the resulting [`Settings`] are immutable for the rest of the run.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASS: &str = "DB_PASS";
pub const DOMAIN: &str = "DOMAIN";
pub const CERTBOT_EMAIL: &str = "CERTBOT_EMAIL";

pub const DEFAULT_DB_NAME: &str = "project_db";
pub const DEFAULT_DB_USER: &str = "project_user";

/// File name looked up in the working directory when no file is given
pub const LOCAL_ENV_FILE: &str = "stackup.toml";

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("valid identifier regex"));

static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$")
        .expect("valid hostname regex")
});

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Rejected configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must contain only letters, digits and underscores (1-64 chars), got {value:?}")]
    InvalidIdentifier { key: &'static str, value: String },

    #[error("{key} is not a valid host name: {value:?}")]
    InvalidHostname { key: &'static str, value: String },

    #[error("{key} is not a valid email address: {value:?}")]
    InvalidEmail { key: &'static str, value: String },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("env file not found: {0}")]
    EnvFileNotFound(PathBuf),
}

/// A value that must never be printed
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for handing to a command's stdin
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub db_name: String,
    pub db_user: String,
    pub db_pass: Secret,
    pub domain: String,
    /// Registration email for the certificate authority
    pub email: Option<String>,
    /// Home directory of the invoking user
    pub home: PathBuf,
}

impl Settings {
    /// The names a certificate is requested for
    pub fn certificate_names(&self) -> [String; 2] {
        [self.domain.clone(), format!("www.{}", self.domain)]
    }
}

/// Source of interactive answers
pub trait Prompter {
    /// Ask for a visible value
    fn input(&mut self, prompt: &str) -> Result<String>;

    /// Ask for a value without echoing it to the terminal
    fn password(&mut self, prompt: &str) -> Result<Secret>;
}

/// Prompts on the controlling terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .with_context(|| format!("Failed to read {prompt}"))
    }

    fn password(&mut self, prompt: &str) -> Result<Secret> {
        let value = dialoguer::Password::new()
            .with_prompt(prompt)
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .with_context(|| format!("Failed to read {prompt}"))?;
        Ok(Secret::new(value))
    }
}

/// Values loaded from the optional key-value file
///
/// The file is a flat TOML table of strings using the same key names as
/// the environment, e.g. `DB_NAME = "shop"`.
#[derive(Debug, Default, Clone)]
pub struct FileValues {
    values: BTreeMap<String, String>,
}

impl FileValues {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid env file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let values: BTreeMap<String, String> = toml::from_str(content)?;
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Find the key-value file to load
///
/// An explicitly named file must exist. Otherwise `./stackup.toml` and then
/// `~/.config/stackup/config.toml` are tried, and having neither is fine.
pub fn locate_env_file(explicit: Option<&str>) -> Result<Option<PathBuf>> {
    locate_env_file_in(explicit, Path::new(LOCAL_ENV_FILE), config_dir())
}

fn locate_env_file_in(
    explicit: Option<&str>,
    local: &Path,
    config_dir: Option<PathBuf>,
) -> Result<Option<PathBuf>> {
    if let Some(raw) = explicit {
        let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
        if !path.is_file() {
            return Err(ConfigError::EnvFileNotFound(path).into());
        }
        return Ok(Some(path));
    }

    if local.is_file() {
        return Ok(Some(local.to_path_buf()));
    }

    Ok(config_dir
        .map(|dir| dir.join("config.toml"))
        .filter(|p| p.is_file()))
}

/// `~/.config/stackup`
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("stackup"))
}

/// Resolve settings from the environment, the file, and the prompter
///
/// `env` is consulted first (empty values count as unset), then `file`.
/// Keys with a default never prompt. `DB_PASS` and `DOMAIN` have no
/// default and are asked for when no source supplies them.
pub fn resolve<E>(
    env: E,
    file: &FileValues,
    prompter: &mut dyn Prompter,
    home: PathBuf,
) -> Result<Settings>
where
    E: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| -> Option<String> {
        env(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| file.get(key).map(str::to_string))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let db_name = lookup(DB_NAME).unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
    let db_user = lookup(DB_USER).unwrap_or_else(|| DEFAULT_DB_USER.to_string());
    validate_identifier(DB_NAME, &db_name)?;
    validate_identifier(DB_USER, &db_user)?;

    // The password is taken verbatim, surrounding whitespace included.
    let db_pass = match env(DB_PASS)
        .filter(|v| !v.is_empty())
        .or_else(|| file.get(DB_PASS).filter(|v| !v.is_empty()).map(str::to_string))
    {
        Some(value) => Secret::new(value),
        None => prompter
            .password(&format!("MySQL password for {db_user}"))
            .with_context(|| format!("{DB_PASS} is not set and could not be prompted for"))?,
    };
    if db_pass.expose().is_empty() {
        return Err(ConfigError::Empty { key: DB_PASS }.into());
    }

    let domain = match lookup(DOMAIN) {
        Some(value) => value,
        None => prompter
            .input("Domain name (without www.)")
            .with_context(|| format!("{DOMAIN} is not set and could not be prompted for"))?
            .trim()
            .to_string(),
    };
    let domain = domain.to_ascii_lowercase();
    validate_hostname(DOMAIN, &domain)?;

    let email = lookup(CERTBOT_EMAIL);
    if let Some(ref value) = email {
        validate_email(CERTBOT_EMAIL, value)?;
    }

    log::debug!("resolved settings: db_name={db_name} db_user={db_user} domain={domain}");

    Ok(Settings {
        db_name,
        db_user,
        db_pass,
        domain,
        email,
        home,
    })
}

fn validate_identifier(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            key,
            value: value.to_string(),
        })
    }
}

fn validate_hostname(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Empty { key });
    }
    if value.len() <= 253 && HOSTNAME.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidHostname {
            key,
            value: value.to_string(),
        })
    }
}

fn validate_email(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if EMAIL.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEmail {
            key,
            value: value.to_string(),
        })
    }
}

// config.rs - Bot configuration
// Read once at start-up from botconfig.txt (KEY=VALUE lines, # comments),
// searched in a few relative locations. Any key missing from the file falls
// back to the process environment. No hot reload.

use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::chain::Network;
use crate::framework::{DispatcherConfig, NoticePolicy};

const CONFIG_PATHS: [&str; 4] = [
    "botconfig.txt",
    "../botconfig.txt",
    "../../botconfig.txt",
    "src/botconfig.txt",
];

pub const DEFAULT_PREFIX: &str = "^";
pub const DEFAULT_COOLDOWN_MS: u64 = 3_000;
pub const DEFAULT_NAMES_FILE: &str = "names.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} not found in botconfig.txt or environment")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
    pub admins: HashSet<String>,
    pub disabled_commands: Vec<String>,
    pub cooldown: Duration,
    pub notices: NoticePolicy,
    pub default_channel: Option<u64>,
    pub names_file: PathBuf,
    pub network: Network,
    pub debug: bool,
    /// Which botconfig.txt was read, if any.
    pub loaded_from: Option<PathBuf>,
}

impl BotConfig {
    /// Load from the first botconfig.txt found, then the environment. Runs
    /// before the logger exists, so it reports through `loaded_from` instead
    /// of logging.
    pub fn load() -> Result<Self, ConfigError> {
        let found = CONFIG_PATHS.iter().find_map(|path| {
            fs::read_to_string(path)
                .ok()
                .map(|content| (PathBuf::from(path), parse_config_text(&content)))
        });
        let (loaded_from, file) = match found {
            Some((path, map)) => (Some(path), map),
            None => (None, HashMap::new()),
        };

        let mut config = Self::from_lookup(|key| file.get(key).cloned().or_else(|| env::var(key).ok()))?;
        config.loaded_from = loaded_from;
        Ok(config)
    }

    /// Build from any key lookup; `load` and the tests share this.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        if token == "YOUR_BOT_TOKEN_HERE" {
            return Err(ConfigError::Invalid {
                key: "DISCORD_TOKEN",
                value: "<placeholder>".to_string(),
            });
        }

        let prefix = get("PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                key: "PREFIX",
                value: prefix,
            });
        }

        let cooldown_ms = match get("COOLDOWN_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "COOLDOWN_MS",
                value: raw,
            })?,
            None => DEFAULT_COOLDOWN_MS,
        };

        let default_channel = match get("DEFAULT_CHANNEL") {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "DEFAULT_CHANNEL",
                value: raw,
            })?),
            None => None,
        };

        let network = match get("NETWORK") {
            Some(raw) => raw.parse::<Network>().map_err(|_| ConfigError::Invalid {
                key: "NETWORK",
                value: raw,
            })?,
            None => Network::default(),
        };

        let notices = NoticePolicy {
            unknown_command: parse_flag(get("UNKNOWN_COMMAND_NOTICE"), "UNKNOWN_COMMAND_NOTICE", false)?,
            disabled_command: parse_flag(get("DISABLED_COMMAND_NOTICE"), "DISABLED_COMMAND_NOTICE", true)?,
        };

        Ok(Self {
            token,
            prefix,
            admins: split_list(get("ADMINS")).into_iter().collect(),
            disabled_commands: split_list(get("DISABLED_COMMANDS")),
            cooldown: Duration::from_millis(cooldown_ms),
            notices,
            default_channel,
            names_file: PathBuf::from(get("NAMES_FILE").unwrap_or_else(|| DEFAULT_NAMES_FILE.to_string())),
            network,
            debug: get("DEBUG").as_deref() == Some("1"),
            loaded_from: None,
        })
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            prefix: self.prefix.clone(),
            cooldown_window: self.cooldown,
            notices: self.notices,
        }
    }
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, a
/// leading BOM is tolerated, and only the first `=` splits.
pub fn parse_config_text(content: &str) -> HashMap<String, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            config.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    config
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_flag(raw: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::Invalid {
            key,
            value: raw.unwrap_or_default(),
        }),
    }
}

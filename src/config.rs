use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::defs::DEFAULT_DELAY_MS;
use crate::logging::{log_info, log_warning};

pub const CONFIG_PATH: &str = "conf/bingo.conf";

/// Game rule and caller flags. Read once per draw; may change between draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub skip_unused: bool,
    pub wild_bingo: bool,
    pub evens_odds: bool,
    pub double_call: bool,
    pub extra_talk: bool,
    pub chime: bool,
    pub enable_caller: bool,
    pub display_board_only: bool,
    // Autoplay interval in milliseconds
    pub delay: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            skip_unused: true,
            wild_bingo: false,
            evens_odds: false,
            double_call: false,
            extra_talk: true,
            chime: false,
            enable_caller: false,
            display_board_only: false,
            delay: DEFAULT_DELAY_MS,
        }
    }
}

impl GameConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config_map = parse_config(&content)?;
        Ok(Self::from_map(&config_map))
    }

    fn from_map(config_map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            config_map.get(key).and_then(|v| parse_bool(v)).unwrap_or(default)
        };

        let delay = config_map.get("delay")
            .and_then(|d| d.parse::<u64>().ok())
            .filter(|&d| d > 0)
            .unwrap_or(defaults.delay);

        GameConfig {
            skip_unused: flag("skip_unused", defaults.skip_unused),
            wild_bingo: flag("wild_bingo", defaults.wild_bingo),
            evens_odds: flag("evens_odds", defaults.evens_odds),
            double_call: flag("double_call", defaults.double_call),
            extra_talk: flag("extra_talk", defaults.extra_talk),
            chime: flag("chime", defaults.chime),
            enable_caller: flag("enable_caller", defaults.enable_caller),
            display_board_only: flag("display_board_only", defaults.display_board_only),
            delay,
        }
    }

    pub fn load_or_default() -> Self {
        Self::load_from_or_default(CONFIG_PATH)
    }

    pub fn load_from_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(config) => {
                log_info(&format!("Loaded game configuration from {}", path.display()));
                config
            }
            Err(e) => {
                log_warning(&format!("Could not load config from {}: {}. Using defaults.", path.display(), e));
                Self::default()
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_config(content: &str) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let mut config = HashMap::new();

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Parse key = value pairs
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            config.insert(key, value);
        }
    }

    Ok(config)
}

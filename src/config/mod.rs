//! Configuration management for WagerBot
//!
//! Configuration is read from a TOML file, then environment overrides are
//! applied and the result is validated. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{ChatId, ParticipantId};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bot: BotConfig,
    pub game: GameConfig,
    pub moderation: ModerationConfig,
}

/// Storage and logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub data_dir: PathBuf,
    pub sessions_file: String,
    pub points_file: String,
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.wagerbot"),
            sessions_file: "sessions.json".to_string(),
            points_file: "points.json".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Game rules that are tunable per deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Idle time after which an unfinished ship placement is abandoned
    #[serde(with = "humantime_serde")]
    pub placement_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
    pub allowed_best_of: Vec<u8>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            placement_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(30),
            allowed_best_of: vec![3, 5, 9],
        }
    }
}

/// Admins, display names and the points punishment rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub owner: Option<i64>,
    pub admins: Vec<i64>,
    pub nicknames: Vec<Nickname>,
    /// How non-admin members are shown in announcements
    pub member_label: String,
    pub strike_limit: u32,
    #[serde(with = "humantime_serde")]
    pub mute_duration: Duration,
    pub punishments: Vec<PunishmentRule>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            owner: None,
            admins: Vec::new(),
            nicknames: Vec::new(),
            member_label: "Member".to_string(),
            strike_limit: 3,
            mute_duration: Duration::from_secs(24 * 60 * 60),
            punishments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nickname {
    pub id: i64,
    pub name: String,
}

/// Announced once when a member falls below `threshold` in `room`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentRule {
    pub room: i64,
    pub threshold: i64,
    pub message: String,
}

impl ModerationConfig {
    /// Owner first, then configured admins, without duplicates
    pub fn admin_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<ParticipantId> = self.owner.into_iter().map(ParticipantId).collect();
        for &id in &self.admins {
            if !ids.contains(&ParticipantId(id)) {
                ids.push(ParticipantId(id));
            }
        }
        ids
    }

    pub fn nickname_map(&self) -> BTreeMap<ParticipantId, String> {
        self.nicknames
            .iter()
            .map(|n| (ParticipantId(n.id), n.name.clone()))
            .collect()
    }

    pub fn punishments_for(&self, room: ChatId) -> impl Iterator<Item = &PunishmentRule> {
        self.punishments.iter().filter(move |rule| rule.room == room.0)
    }
}

impl Config {
    /// Load from `path` (or the default location), apply environment
    /// overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        config.override_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// `$XDG_CONFIG_HOME/wagerbot/config.toml` or the platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wagerbot").join("config.toml"))
    }

    fn override_from_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply `WAGERBOT_*` overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("WAGERBOT_DATA_DIR") {
            self.bot.data_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("WAGERBOT_LOG_LEVEL") {
            self.bot.log_level = val;
        }

        if let Some(val) = lookup("WAGERBOT_OWNER") {
            let owner = val
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid owner id: {}", val)))?;
            self.moderation.owner = Some(owner);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.bot.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if self.bot.sessions_file.is_empty() || self.bot.points_file.is_empty() {
            return Err(Error::Config("Store file names cannot be empty".to_string()));
        }

        if self.game.placement_timeout.is_zero() {
            return Err(Error::Config("Placement timeout must be > 0".to_string()));
        }

        if self.game.sweep_interval.is_zero() {
            return Err(Error::Config("Sweep interval must be > 0".to_string()));
        }

        if self.game.allowed_best_of.is_empty() {
            return Err(Error::Config("At least one best-of value is required".to_string()));
        }

        if let Some(bad) = self
            .game
            .allowed_best_of
            .iter()
            .find(|&&n| n == 0 || n % 2 == 0)
        {
            return Err(Error::Config(format!(
                "Best-of values must be odd and positive, got {}",
                bad
            )));
        }

        if self.moderation.strike_limit == 0 {
            return Err(Error::Config("Strike limit must be > 0".to_string()));
        }

        Ok(())
    }

    /// Data directory with a leading `~` expanded to the home directory
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.bot.data_dir)
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.data_dir().join(&self.bot.sessions_file)
    }

    pub fn points_path(&self) -> PathBuf {
        self.data_dir().join(&self.bot.points_file)
    }
}

/// Expand a leading `~` using `dirs::home_dir`
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

use crate::error::{BeanstalkError, Result};
use crate::types::{ActionKind, JitterSlot};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// JitterProfile
// ---------------------------------------------------------------------------

/// A randomized delay range in whole seconds.
///
/// `min_secs <= max_secs` is enforced when the profile is built or
/// deserialized, never when it is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawJitterProfile")]
pub struct JitterProfile {
    pub enabled: bool,
    pub min_secs: u64,
    pub max_secs: u64,
    /// Also pause between creating an artifact and deleting it.
    pub between_create_and_delete: bool,
}

#[derive(Deserialize)]
struct RawJitterProfile {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    min_secs: u64,
    #[serde(default)]
    max_secs: u64,
    #[serde(default)]
    between_create_and_delete: bool,
}

impl TryFrom<RawJitterProfile> for JitterProfile {
    type Error = BeanstalkError;

    fn try_from(raw: RawJitterProfile) -> Result<Self> {
        let mut profile = JitterProfile::new(raw.min_secs, raw.max_secs)?;
        profile.enabled = raw.enabled;
        profile.between_create_and_delete = raw.between_create_and_delete;
        Ok(profile)
    }
}

impl JitterProfile {
    /// An enabled profile over `[min_secs, max_secs]`.
    pub fn new(min_secs: u64, max_secs: u64) -> Result<Self> {
        if min_secs > max_secs {
            return Err(BeanstalkError::InvalidJitter {
                min: min_secs,
                max: max_secs,
            });
        }
        Ok(Self {
            enabled: true,
            min_secs,
            max_secs,
            between_create_and_delete: false,
        })
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min_secs: 0,
            max_secs: 0,
            between_create_and_delete: false,
        }
    }

    pub fn with_create_delete_pause(mut self, apply: bool) -> Self {
        self.between_create_and_delete = apply;
        self
    }
}

impl Default for JitterProfile {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JitterConfig {
    #[serde(default)]
    pub update: JitterProfile,
    #[serde(default)]
    pub comment: JitterProfile,
    #[serde(default)]
    pub message: JitterProfile,
    #[serde(default)]
    pub media_log: JitterProfile,
}

impl JitterConfig {
    pub fn profile_for(&self, kind: ActionKind) -> JitterProfile {
        match kind.jitter_slot() {
            JitterSlot::Update => self.update,
            JitterSlot::Comment => self.comment,
            JitterSlot::Message => self.message,
            JitterSlot::MediaLog => self.media_log,
            JitterSlot::Unpaced => JitterProfile::disabled(),
        }
    }
}

// ---------------------------------------------------------------------------
// Accounts and action parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub track_id: u64,
    pub comment_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Stored session cookie.
    pub credential: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_target: Option<ReplyTarget>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipients: Vec<u64>,
}

impl AccountConfig {
    /// Name used in logs before the account is signed in.
    pub fn display_label(&self, index: usize) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("account#{index}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    pub track_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaLogConfig {
    pub picture_dir: PathBuf,
    #[serde(default)]
    pub track_ids: Vec<u64>,
}

// ---------------------------------------------------------------------------
// CronConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cron_expression")]
    pub expression: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Whole-run delay sampled before each periodic run.
    #[serde(default)]
    pub jitter: JitterProfile,
}

fn default_cron_expression() -> String {
    "0 30 8 * * *".to_string()
}

fn default_timezone() -> String {
    "Asia/Hong_Kong".to_string()
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            expression: default_cron_expression(),
            timezone: default_timezone(),
            jitter: JitterProfile::disabled(),
        }
    }
}

impl CronConfig {
    pub fn schedule(&self) -> Result<cron::Schedule> {
        cron::Schedule::from_str(&self.expression).map_err(|e| BeanstalkError::InvalidCron {
            expression: self.expression.clone(),
            reason: e.to_string(),
        })
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| BeanstalkError::UnknownTimezone(self.timezone.clone()))
    }
}

// ---------------------------------------------------------------------------
// PushConfig / GatewayConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushplus_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serverchan_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_log: Option<MediaLogConfig>,
    #[serde(default)]
    pub jitter: JitterConfig,
    #[serde(default)]
    pub membership_growth: bool,
    #[serde(default)]
    pub cron: CronConfig,
    #[serde(default)]
    pub push: PushConfig,
    pub gateway: GatewayConfig,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("log")
}

impl Config {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            debug: false,
            log_dir: default_log_dir(),
            accounts: Vec::new(),
            content: Vec::new(),
            share: None,
            media_log: None,
            jitter: JitterConfig::default(),
            membership_growth: false,
            cron: CronConfig::default(),
            push: PushConfig::default(),
            gateway: GatewayConfig {
                base_url: gateway_url.into(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }

    /// Parse a config document. JSON documents are accepted as well.
    pub fn parse(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    /// Read and parse the config file, refusing documents with errors.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg = Self::parse(&data)?;
        let errors: Vec<String> = cfg
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if !errors.is_empty() {
            return Err(BeanstalkError::InvalidConfig(errors.join("; ")));
        }
        Ok(cfg)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if self.accounts.is_empty() {
            error("no accounts configured".to_string());
        }
        if self.gateway.base_url.trim().is_empty() {
            error("gateway.base_url is empty".to_string());
        }
        if self.cron.enabled {
            if let Err(e) = self.cron.schedule() {
                error(e.to_string());
            }
            if let Err(e) = self.cron.tz() {
                error(e.to_string());
            }
        }

        let mut warn = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message,
            })
        };

        if self.content.is_empty() {
            warn("content pool is empty; content-bearing actions will be skipped".to_string());
        }
        for (i, account) in self.accounts.iter().enumerate() {
            let label = account.display_label(i);
            if account.credential.trim().is_empty() {
                warn(format!("{label} has an empty credential"));
            }
            if account.reply_target.is_none() {
                warn(format!(
                    "{label} has no reply_target; comment actions will be skipped"
                ));
            }
            if account.recipients.is_empty() {
                warn(format!(
                    "{label} has no recipients; direct messages will be skipped"
                ));
            }
        }
        if let Some(media_log) = &self.media_log {
            if media_log.track_ids.is_empty() {
                warn("media_log.track_ids is empty; media logs will be skipped".to_string());
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

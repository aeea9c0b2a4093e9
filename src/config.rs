use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name used in outbound notification subjects
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Credit amounts and the recharge command literal
    #[serde(default)]
    pub credits: CreditConfig,

    /// Recharge monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Mail API configuration (monitored mailbox and outbound sends)
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditConfig {
    /// Balance a newly created account starts with
    #[serde(default = "default_initial_credits")]
    pub initial: i64,

    /// Fixed amount applied per accepted recharge command
    #[serde(default = "default_recharge_amount")]
    pub recharge_amount: i64,

    /// Exact subject line that triggers a recharge (matched case-insensitively)
    #[serde(default = "default_recharge_subject")]
    pub recharge_subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between mailbox scans
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Directory holding the checkpoint state file
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Base URL of the mail API
    pub api_url: String,

    /// Bearer token for the mail API
    pub api_token: String,

    /// Monitored mailbox address; also the From of outbound notifications
    pub address: String,
}

fn default_service_name() -> String {
    "Startup Network Finder".to_string()
}

fn default_initial_credits() -> i64 {
    5
}

fn default_recharge_amount() -> i64 {
    5
}

fn default_recharge_subject() -> String {
    "recharge 5 credits".to_string()
}

fn default_check_interval() -> u64 {
    60
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_credits(),
            recharge_amount: default_recharge_amount(),
            recharge_subject: default_recharge_subject(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            state_dir: default_state_dir(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(
            service = %config.service_name,
            mailbox = %config.mail.address,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check required values once at startup, reporting every gap together
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut missing = Vec::new();
        if self.mail.api_url.is_empty() {
            missing.push("mail.api_url");
        }
        if self.mail.api_token.is_empty() {
            missing.push("mail.api_token");
        }
        if self.mail.address.is_empty() {
            missing.push("mail.address");
        }
        if self.credits.recharge_subject.trim().is_empty() {
            missing.push("credits.recharge_subject");
        }
        if !missing.is_empty() {
            return Err(format!("missing required configuration: {}", missing.join(", ")).into());
        }
        if self.credits.recharge_amount <= 0 {
            return Err("credits.recharge_amount must be positive".into());
        }
        if self.credits.initial < 0 {
            return Err("credits.initial must not be negative".into());
        }
        if self.monitor.check_interval_secs == 0 {
            return Err("monitor.check_interval_secs must be positive".into());
        }
        Ok(())
    }
}

use crate::{
    referral::DEFAULT_REFERRAL_BASE_URL,
    rules::ClaimRules,
    session::{
        DEFAULT_AD_SLOTS,
        SessionConfig,
    },
};
use clap::{
    Parser,
    builder::TypedValueParser,
};
use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";
pub const DEFAULT_LOG_DIR: &str = "~/.reward-claims/logs";

#[derive(Parser, Clone, Debug)]
#[command(version, about = "Terminal client for claiming ad and daily rewards", long_about = None)]
pub struct AppConfig {
    /// Backend base URL; `/api/handle_user_actions` is appended.
    #[arg(long, env = "REWARDS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, env = "REWARDS_REFERRAL_BASE_URL", default_value = DEFAULT_REFERRAL_BASE_URL)]
    pub referral_base_url: String,

    #[arg(
        long,
        default_value_t = DEFAULT_AD_SLOTS,
        value_parser = clap::value_parser!(u8).range(1..=16).map(usize::from),
    )]
    pub ad_slots: usize,

    #[arg(long, env = "REWARDS_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// How long the loading screen stays up.
    #[arg(long, default_value_t = 2000)]
    pub loading_ms: u64,

    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Keep optimistic credits when their sync request fails.
    #[arg(long)]
    pub keep_optimistic_on_failure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            referral_base_url: DEFAULT_REFERRAL_BASE_URL.to_string(),
            ad_slots: DEFAULT_AD_SLOTS,
            log_dir: DEFAULT_LOG_DIR.to_string(),
            loading_ms: 2000,
            request_timeout_secs: 10,
            keep_optimistic_on_failure: false,
        }
    }
}

impl AppConfig {
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.log_dir).into_owned())
    }

    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            ad_slots: self.ad_slots,
            rules: ClaimRules::default(),
            referral_base_url: self.referral_base_url.clone(),
            rollback_on_failure: !self.keep_optimistic_on_failure,
        }
    }
}

use std::path::PathBuf;

use clap::Parser;

/// HLTV team tracker with Telegram chat commands
#[derive(Parser, Debug, Clone)]
#[command(name = "teamwatch-bot", version, about)]
pub struct Config {
    /// HLTV numeric team id (e.g. 8297 for FURIA)
    #[arg(long, env = "TEAM_CODE", default_value = "8297")]
    pub team_code: String,

    /// HLTV team URL slug
    #[arg(long, env = "TEAM_SLUG", default_value = "furia")]
    pub team_slug: String,

    /// Display name used in chat replies
    #[arg(long, env = "TEAM_NAME", default_value = "FURIA")]
    pub team_name: String,

    /// Upstream site base URL
    #[arg(long, env = "HLTV_BASE_URL", default_value = "https://www.hltv.org")]
    pub hltv_base_url: String,

    /// Poll interval when no match is scheduled today (seconds)
    #[arg(long, env = "IDLE_INTERVAL_SECS", default_value = "1800")]
    pub idle_interval_secs: u64,

    /// Poll interval on a match day, before the match goes live (seconds)
    #[arg(long, env = "MATCH_DAY_INTERVAL_SECS", default_value = "600")]
    pub match_day_interval_secs: u64,

    /// Poll interval while a match is live (seconds)
    #[arg(long, env = "LIVE_INTERVAL_SECS", default_value = "180")]
    pub live_interval_secs: u64,

    /// Team/roster page cache TTL (seconds)
    #[arg(long, env = "TEAM_INFO_TTL_SECS", default_value = "3600")]
    pub team_info_ttl_secs: u64,

    /// Match listing cache TTL (seconds)
    #[arg(long, env = "MATCHES_TTL_SECS", default_value = "600")]
    pub matches_ttl_secs: u64,

    /// Bounded wait for a page's readiness marker (seconds)
    #[arg(long, env = "READINESS_TIMEOUT_SECS", default_value = "15")]
    pub readiness_timeout_secs: u64,

    /// Chrome/Chromium binary path (autodetected when unset)
    #[arg(long, env = "CHROME_BINARY")]
    pub chrome_binary: Option<PathBuf>,

    /// Telegram bot token; without it only the crawler runs
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.team_code.is_empty() || !self.team_code.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("team_code must be a numeric HLTV team id");
        }
        if self.team_slug.is_empty() {
            anyhow::bail!("team_slug must not be empty");
        }
        for (name, value) in [
            ("idle_interval_secs", self.idle_interval_secs),
            ("match_day_interval_secs", self.match_day_interval_secs),
            ("live_interval_secs", self.live_interval_secs),
            ("team_info_ttl_secs", self.team_info_ttl_secs),
            ("matches_ttl_secs", self.matches_ttl_secs),
            ("readiness_timeout_secs", self.readiness_timeout_secs),
        ] {
            if value == 0 {
                anyhow::bail!("{name} must be positive");
            }
        }
        if self.live_interval_secs > self.match_day_interval_secs
            || self.match_day_interval_secs > self.idle_interval_secs
        {
            anyhow::bail!("poll intervals must tighten with activity: live <= match-day <= idle");
        }
        Ok(())
    }
}

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub slack_bot_token: String,
    pub slack_signing_secret: String,
    /// Channel the approval prompts are posted to.
    pub prompt_channel: String,
    /// Reaction names counted as approvals. Anything else on a tracked
    /// message counts as a rejection.
    pub approve_reactions: Vec<String>,
    /// Seconds a pending approval may wait before the sweep expires it.
    /// Set via SIGNOFF_APPROVAL_DEADLINE_SECS. Default: 300.
    pub approval_deadline_secs: u64,
    /// Seconds between expiry sweeps.
    /// Set via SIGNOFF_SWEEP_INTERVAL_SECS. Default: 5.
    pub sweep_interval_secs: u64,
    /// Base URL of the external discharge authority.
    pub authority_url: String,
}

impl Config {
    pub fn approval_deadline(&self) -> Duration {
        Duration::from_secs(self.approval_deadline_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let slack_signing_secret = std::env::var("SLACK_SIGNING_SECRET").unwrap_or_default();
    if slack_signing_secret.is_empty() {
        let env_mode = std::env::var("SIGNOFF_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default();
        if env_mode == "production" {
            anyhow::bail!(
                "SLACK_SIGNING_SECRET is not set. Inbound events cannot be \
                 authenticated without it; refusing to run in production."
            );
        }
        eprintln!("⚠️  SLACK_SIGNING_SECRET is not set — inbound event verification will reject everything.");
    }

    Ok(Config {
        port: std::env::var("SIGNOFF_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .unwrap_or(3000),
        slack_bot_token: std::env::var("SLACK_BOT_TOKEN").unwrap_or_default(),
        slack_signing_secret,
        prompt_channel: std::env::var("SIGNOFF_CHANNEL").unwrap_or_else(|_| "C0000000000".into()),
        approve_reactions: parse_reactions(
            &std::env::var("SIGNOFF_APPROVE_REACTIONS")
                .unwrap_or_else(|_| "+1,thumbsup,yes,celebrate".into()),
        ),
        approval_deadline_secs: std::env::var("SIGNOFF_APPROVAL_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
        sweep_interval_secs: std::env::var("SIGNOFF_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5),
        authority_url: std::env::var("SIGNOFF_AUTHORITY_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8089".into()),
    })
}

fn parse_reactions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

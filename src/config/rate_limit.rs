use std::env;

/// Requests-per-second budget with a burst allowance, applied per client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// register/login — tight, these are brute-force targets.
    pub auth: RateLimitRule,
    /// Everything behind the auth middleware.
    pub api: RateLimitRule,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth: RateLimitRule {
                per_second: 5,
                burst_size: 10,
            },
            api: RateLimitRule {
                per_second: 20,
                burst_size: 40,
            },
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(raw) = env::var("RATE_LIMIT_ENABLED") {
            cfg.enabled = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(rule) = parse_rule_env("RATE_LIMIT_AUTH") {
            cfg.auth = rule;
        }
        if let Some(rule) = parse_rule_env("RATE_LIMIT_API") {
            cfg.api = rule;
        }

        cfg
    }
}

/// Parse a "per_second:burst" pair, e.g. `RATE_LIMIT_API=30:60`.
fn parse_rule_env(name: &str) -> Option<RateLimitRule> {
    let raw = env::var(name).ok()?;
    match parse_rule(&raw) {
        Ok(rule) => Some(rule),
        Err(err) => {
            tracing::warn!("Invalid {} '{}': {}", name, raw, err);
            None
        }
    }
}

fn parse_rule(raw: &str) -> Result<RateLimitRule, String> {
    let (per, burst) = raw
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("invalid rule '{}', expected per:burst", raw.trim()))?;

    let per_second: u64 = per
        .trim()
        .parse()
        .map_err(|_| format!("invalid per_second '{}'", per.trim()))?;
    let burst_size: u32 = burst
        .trim()
        .parse()
        .map_err(|_| format!("invalid burst_size '{}'", burst.trim()))?;

    if per_second == 0 || burst_size == 0 {
        return Err("per_second and burst_size must be > 0".to_string());
    }

    Ok(RateLimitRule {
        per_second,
        burst_size,
    })
}

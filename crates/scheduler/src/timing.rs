//! Fire-timing model: fixed interval or cron expression.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::error;

use subguard_core::AppConfig;

/// The active timing mode. Exactly one is in effect at a time.
#[derive(Debug, Clone)]
pub enum TimingSpec {
    /// Fixed period between rounds.
    Interval { period: Duration },
    /// Fire on cron-expression matches only.
    Cron { schedule: Schedule, expr: String },
}

impl TimingSpec {
    /// Derive the active timing mode from configuration.
    ///
    /// A non-empty cron expression wins over the interval. An unparsable
    /// expression is recoverable: it is logged and the mode falls back to
    /// the configured interval.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::derive(&config.cron_expression, config.interval())
    }

    /// Derive a timing mode from a raw cron expression and a fallback interval.
    pub fn derive(cron_expression: &str, interval: Duration) -> Self {
        let expr = cron_expression.trim();
        if expr.is_empty() {
            return TimingSpec::Interval { period: interval };
        }
        match parse_cron(expr) {
            Ok(schedule) => TimingSpec::Cron {
                schedule,
                expr: expr.to_string(),
            },
            Err(e) => {
                error!(
                    cron = %expr,
                    error = %e,
                    interval_secs = interval.as_secs(),
                    "invalid cron expression, falling back to interval mode"
                );
                TimingSpec::Interval { period: interval }
            }
        }
    }

    /// Next scheduled fire time, measured from now.
    ///
    /// `None` only for a cron schedule with no upcoming matches.
    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        match self {
            TimingSpec::Interval { period } => {
                let period = chrono::Duration::from_std(*period)
                    .unwrap_or_else(|_| chrono::Duration::zero());
                Some(Utc::now() + period)
            }
            TimingSpec::Cron { schedule, .. } => schedule.upcoming(Utc).next(),
        }
    }

    pub fn is_cron(&self) -> bool {
        matches!(self, TimingSpec::Cron { .. })
    }
}

/// Parse a cron expression, auto-prepending "0 " for 5-field expressions.
///
/// The `cron` crate requires 6 fields (sec min hr dom mon dow), but users
/// typically write 5-field cron (min hr dom mon dow). We detect and adapt.
pub(crate) fn parse_cron(expr: &str) -> Result<Schedule, cron::error::Error> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() == 5 {
        let six_field = format!("0 {}", expr);
        Schedule::from_str(&six_field)
    } else {
        Schedule::from_str(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cron_five_field_auto_prefix() {
        let schedule = parse_cron("*/15 * * * *").unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }

    #[test]
    fn parse_cron_six_field() {
        let schedule = parse_cron("0 */15 * * * *").unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }

    #[test]
    fn parse_cron_invalid() {
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn empty_expression_selects_interval_mode() {
        let spec = TimingSpec::derive("", Duration::from_secs(600));
        assert!(matches!(
            spec,
            TimingSpec::Interval { period } if period == Duration::from_secs(600)
        ));
    }

    #[test]
    fn valid_expression_selects_cron_mode() {
        let spec = TimingSpec::derive("0 6 * * *", Duration::from_secs(600));
        assert!(spec.is_cron());
    }

    #[test]
    fn invalid_expression_falls_back_to_interval() {
        let spec = TimingSpec::derive("every sunday at dawn", Duration::from_secs(600));
        assert!(matches!(
            spec,
            TimingSpec::Interval { period } if period == Duration::from_secs(600)
        ));
    }

    #[test]
    fn interval_next_fire_is_period_ahead() {
        let spec = TimingSpec::Interval {
            period: Duration::from_secs(3600),
        };
        let next = spec.next_fire().unwrap();
        let delta = next - Utc::now();
        assert!(delta > chrono::Duration::minutes(59));
        assert!(delta <= chrono::Duration::minutes(61));
    }

    #[test]
    fn cron_next_fire_is_in_the_future() {
        let spec = TimingSpec::derive("*/5 * * * *", Duration::from_secs(600));
        let next = spec.next_fire().unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn config_derivation_uses_interval_minutes() {
        let config = AppConfig {
            check_interval: 2,
            ..AppConfig::default()
        };
        let spec = TimingSpec::from_config(&config);
        assert!(matches!(
            spec,
            TimingSpec::Interval { period } if period == Duration::from_secs(120)
        ));
    }
}

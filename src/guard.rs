//! Optional pre-submission friction checks.
//!
//! These run entirely on the submitting machine and can be skipped by anyone
//! calling the rendering service directly. They are not an access control;
//! abuse prevention has to live in the service.

use crate::config::Guards;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone)]
pub struct GuardContext {
    pub interactions: u32,
    pub hostname: String,
    pub now: OffsetDateTime,
    pub last_accepted: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    TooFewInteractions { seen: u32, required: u32 },
    TooSoon { wait_seconds: u64 },
    HostNotAllowed { hostname: String },
}

impl GuardRejection {
    pub fn message(&self) -> String {
        match self {
            GuardRejection::TooFewInteractions { .. } => {
                "Please fill out the form before submitting.".to_string()
            }
            GuardRejection::TooSoon { wait_seconds } => {
                format!("Please wait {wait_seconds} seconds before submitting again.")
            }
            GuardRejection::HostNotAllowed { hostname } => {
                format!("Report generation is not enabled on host {hostname}.")
            }
        }
    }
}

/// Checks run in order: interactions, interval, host. First failure wins.
pub fn check(cfg: &Guards, ctx: &GuardContext) -> Result<(), GuardRejection> {
    if !cfg.enabled {
        return Ok(());
    }

    if ctx.interactions < cfg.min_interactions {
        return Err(GuardRejection::TooFewInteractions {
            seen: ctx.interactions,
            required: cfg.min_interactions,
        });
    }

    if let Some(last) = ctx.last_accepted {
        let min = Duration::seconds(i64::try_from(cfg.min_interval_seconds).unwrap_or(i64::MAX));
        let elapsed = ctx.now - last;
        if elapsed < min {
            let remaining = min
                .checked_sub(elapsed)
                .map_or(i64::MAX, |d| d.whole_seconds())
                .max(1) as u64;
            return Err(GuardRejection::TooSoon {
                wait_seconds: remaining,
            });
        }
    }

    if !cfg.allowed_hosts.is_empty()
        && !cfg
            .allowed_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&ctx.hostname))
    {
        return Err(GuardRejection::HostNotAllowed {
            hostname: ctx.hostname.clone(),
        });
    }

    Ok(())
}

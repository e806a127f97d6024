//! Liveness counters
//!
//! `HealthChecker` is shared between the exchange pipeline, which calls
//! [`HealthChecker::tick`] for every accepted message, and the status server,
//! which renders [`HealthChecker::snapshot`]. Both sides only touch atomics.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Point-in-time view of the liveness counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSnapshot {
    pub status: String,
    pub uptime_seconds: f64,
    pub uptime_human: String,
    pub last_check: String,
    pub checks_performed: u64,
    pub timestamp: String,
}

/// Uptime and check counters for the liveness probe
#[derive(Debug)]
pub struct HealthChecker {
    started: Instant,
    started_at_millis: i64,
    last_check_millis: AtomicI64,
    checks: AtomicU64,
}

impl HealthChecker {
    pub fn new() -> Self {
        let now = Local::now().timestamp_millis();
        Self {
            started: Instant::now(),
            started_at_millis: now,
            last_check_millis: AtomicI64::new(now),
            checks: AtomicU64::new(0),
        }
    }

    /// Record a check. Returns the new check count.
    pub fn tick(&self) -> u64 {
        self.last_check_millis
            .store(Local::now().timestamp_millis(), Ordering::Relaxed);
        let count = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("Health check #{} passed", count);
        count
    }

    pub fn checks_performed(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let uptime = self.started.elapsed().as_secs_f64();
        HealthSnapshot {
            status: "healthy".to_string(),
            uptime_seconds: (uptime * 100.0).round() / 100.0,
            uptime_human: format_uptime(uptime),
            last_check: format_millis(self.last_check_millis.load(Ordering::Relaxed)),
            checks_performed: self.checks_performed(),
            timestamp: Local::now().format(TIME_FORMAT).to_string(),
        }
    }

    /// Wall-clock start time, formatted like the snapshot timestamps
    pub fn started_at(&self) -> String {
        format_millis(self.started_at_millis)
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a duration in seconds as `"{h}h {m}m {s}s"`
pub fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{}h {}m {}s", hours, minutes, secs)
}

fn format_millis(millis: i64) -> String {
    let local: Option<DateTime<Local>> = Local.timestamp_millis_opt(millis).single();
    local
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

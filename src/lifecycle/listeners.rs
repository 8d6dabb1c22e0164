//! Built-in `beforeResponse` listeners.
//!
//! # Responsibilities
//! - Substitute `{elapsed_time}` / `{memory_usage}` in the response body
//! - Send an already-expired `expires` header in admin and local contexts

use std::fs;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

use crate::container::{lock, SharedResponse};
use crate::failure::Failure;

pub const ELAPSED_TIME_TAG: &str = "{elapsed_time}";
pub const MEMORY_USAGE_TAG: &str = "{memory_usage}";

/// How far in the past the anti-caching `expires` date lies.
pub const EXPIRES_OFFSET_SECS: i64 = 84_600;

/// Replace the usage tags in `body`. Bodies without tags come back unchanged.
pub fn substitute_usage(body: &str, elapsed_ms: u64, memory_mb: f64) -> String {
    if !body.contains(ELAPSED_TIME_TAG) && !body.contains(MEMORY_USAGE_TAG) {
        return body.to_string();
    }
    body.replace(ELAPSED_TIME_TAG, &elapsed_ms.to_string())
        .replace(MEMORY_USAGE_TAG, &round2(memory_mb).to_string())
}

/// Milliseconds since `started`, rounded.
pub fn elapsed_millis(started: Instant) -> u64 {
    (started.elapsed().as_secs_f64() * 1000.0).round() as u64
}

/// Peak resident memory of this process in megabytes (2 decimals).
/// Zero where the platform does not report it.
pub fn peak_memory_mb() -> f64 {
    let kib = fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_vm_hwm(&status))
        .unwrap_or(0);
    round2(kib as f64 / 1024.0)
}

fn parse_vm_hwm(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmHWM:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kib| kib.parse().ok())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// RFC 1123 date `EXPIRES_OFFSET_SECS` before `now`.
pub fn expired_http_date(now: DateTime<Utc>) -> String {
    (now - Duration::seconds(EXPIRES_OFFSET_SECS))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Listener filling in the usage tags.
pub fn usage_listener(
    response: SharedResponse,
    started: Instant,
) -> impl Fn() -> Result<(), Failure> + Send + Sync + 'static {
    move || {
        let elapsed = elapsed_millis(started);
        let memory = peak_memory_mb();
        let mut response = lock(&response);
        let body = substitute_usage(response.body(), elapsed, memory);
        response.set_body(body);
        Ok(())
    }
}

/// Listener defeating caches when `privileged` (admin context or `local`).
pub fn anti_cache_listener(
    response: SharedResponse,
    privileged: bool,
) -> impl Fn() -> Result<(), Failure> + Send + Sync + 'static {
    move || {
        if privileged {
            lock(&response).set_header("expires", expired_http_date(Utc::now()));
        }
        Ok(())
    }
}

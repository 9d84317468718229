// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded fixed-interval readiness polling.
//!
//! Kubernetes controllers converge asynchronously and expose no blocking
//! "done" signal, so every wait is a poll with an attempt budget. A probe
//! may additionally report a distinguished failure, which short-circuits
//! the remaining budget instead of waiting out the full timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::error::Result;

/// A single observation of the target resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// The success predicate matched
    Ready,
    /// Neither predicate matched; carries the last observed status, if any
    Pending(Option<String>),
    /// The failure predicate matched; carries the observed status
    Failed(String),
}

/// Terminal outcome of a readiness wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready { attempts: u32 },
    TimedOut { last_status: Option<String> },
    Failed { status: String, attempts: u32 },
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

/// A parameterized readiness wait: what to watch, how often, and for how long.
#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    /// Human-readable description used in log lines
    pub description: String,
    /// Fixed interval between attempts
    pub interval: Duration,
    /// Attempt budget; at least 1
    pub max_attempts: u32,
}

impl ReadinessCheck {
    pub fn new(description: impl Into<String>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            description: description.into(),
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Derive the attempt budget from a total timeout divided by the interval.
    pub fn from_timeout(
        description: impl Into<String>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        let attempts = (timeout.as_secs() / interval.as_secs().max(1)).max(1) as u32;
        Self::new(description, interval, attempts)
    }
}

/// Repeatedly evaluate `probe` until it reports `Ready` or `Failed`, or the
/// attempt budget is exhausted. The failure predicate is checked on every
/// attempt and returns immediately without further retries. Errors from the
/// probe itself (e.g. an unreachable cluster) escalate to the caller.
pub async fn wait_for<F, Fut>(check: &ReadinessCheck, mut probe: F) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe>>,
{
    let mut last_status = None;

    for attempt in 1..=check.max_attempts {
        match probe().await? {
            Probe::Ready => {
                debug!("{} ready after {} attempts", check.description, attempt);
                return Ok(PollOutcome::Ready { attempts: attempt });
            }
            Probe::Failed(status) => {
                return Ok(PollOutcome::Failed {
                    status,
                    attempts: attempt,
                });
            }
            Probe::Pending(status) => {
                debug!(
                    "{} not ready (attempt {}/{}, status {:?})",
                    check.description, attempt, check.max_attempts, status
                );
                last_status = status;
            }
        }

        if attempt < check.max_attempts {
            sleep(check.interval).await;
        }
    }

    Ok(PollOutcome::TimedOut { last_status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn scripted(statuses: &[&str]) -> (Arc<Mutex<VecDeque<Probe>>>, Arc<Mutex<u32>>) {
        let probes = statuses
            .iter()
            .map(|s| match *s {
                "Ready" => Probe::Ready,
                "Failed" => Probe::Failed("Failed".to_string()),
                other => Probe::Pending(Some(other.to_string())),
            })
            .collect();
        (Arc::new(Mutex::new(probes)), Arc::new(Mutex::new(0)))
    }

    fn fast_check(max_attempts: u32) -> ReadinessCheck {
        ReadinessCheck::new("test resource", Duration::from_millis(1), max_attempts)
    }

    async fn run_scripted(statuses: &[&str], max_attempts: u32) -> (PollOutcome, u32) {
        let (probes, calls) = scripted(statuses);
        let outcome = wait_for(&fast_check(max_attempts), || {
            let probes = probes.clone();
            let calls = calls.clone();
            async move {
                *calls.lock().unwrap() += 1;
                Ok(probes.lock().unwrap().pop_front().expect("probe budget"))
            }
        })
        .await
        .unwrap();
        let count = *calls.lock().unwrap();
        (outcome, count)
    }

    #[tokio::test]
    async fn test_ready_after_three_polls() {
        let (outcome, calls) = run_scripted(&["Pending", "Pending", "Ready"], 10).await;
        assert_eq!(outcome, PollOutcome::Ready { attempts: 3 });
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_failure_short_circuits_budget() {
        let (outcome, calls) = run_scripted(&["Pending", "Failed"], 10).await;
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                status: "Failed".to_string(),
                attempts: 2
            }
        );
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_all_pending_times_out() {
        let (outcome, calls) = run_scripted(&["Pending", "Pending", "Pending", "Pending"], 4).await;
        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                last_status: Some("Pending".to_string())
            }
        );
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_ready_on_first_attempt() {
        let (outcome, calls) = run_scripted(&["Ready"], 1).await;
        assert!(outcome.is_ready());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_probe_error_escalates() {
        let result = wait_for(&fast_check(5), || async {
            Err(crate::error::MusterError::Connectivity(
                "connection refused".to_string(),
            ))
        })
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_attempt_budget_from_timeout() {
        let check = ReadinessCheck::from_timeout(
            "datastores",
            Duration::from_secs(5),
            Duration::from_secs(120),
        );
        assert_eq!(check.max_attempts, 24);
    }

    #[test]
    fn test_attempt_budget_never_zero() {
        let check = ReadinessCheck::from_timeout(
            "short",
            Duration::from_secs(10),
            Duration::from_secs(5),
        );
        assert_eq!(check.max_attempts, 1);
    }
}

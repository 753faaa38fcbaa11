//! Strategy racing for a single candidate.
//!
//! Every strategy runs concurrently and is awaited to completion: a
//! slower high-priority strategy must still be able to beat a fast
//! low-priority one. A strategy only counts once its URL passes the link
//! validator; the lowest priority number among those wins, ties going to
//! discovery order.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::panic_message;
use crate::error::ResolveError;
use crate::stream::{Candidate, HostProvider, ProviderContext, Strategy};
use crate::validator::{LinkValidator, Probe};

/// Lifecycle of one candidate inside a single `resolve()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateState {
    Pending,
    Racing,
    /// At least one strategy produced a validated URL.
    Resolved,
    /// Terminal: nothing validated. No retries within the same call.
    Dropped,
}

/// What one strategy attempt produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success { url: String, probe: Probe },
    Fail(ResolveError),
}

/// Record of one strategy run against one candidate.
#[derive(Debug)]
pub struct ResolutionAttempt {
    pub candidate_id: String,
    pub strategy_name: String,
    pub priority: u32,
    pub outcome: AttemptOutcome,
}

impl ResolutionAttempt {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success { .. })
    }
}

/// The validated URL a candidate resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: String,
    pub strategy: String,
    pub priority: u32,
    pub probe: Probe,
}

/// Result of racing one candidate.
#[derive(Debug)]
pub struct RaceReport {
    pub candidate_id: String,
    pub state: CandidateState,
    /// One entry per strategy, in discovery order.
    pub attempts: Vec<ResolutionAttempt>,
    pub winner: Option<ResolvedLink>,
}

/// Runs a candidate's strategies and picks the winner.
#[derive(Clone)]
pub struct StrategyRacer {
    validator: LinkValidator,
    strategy_timeout: Duration,
}

impl StrategyRacer {
    pub fn new(validator: LinkValidator, strategy_timeout: Duration) -> Self {
        Self {
            validator,
            strategy_timeout,
        }
    }

    pub fn validator(&self) -> &LinkValidator {
        &self.validator
    }

    /// Race all strategies of `candidate` through `provider`.
    pub async fn race(
        &self,
        provider: &dyn HostProvider,
        candidate: &Candidate,
        ctx: &ProviderContext,
    ) -> RaceReport {
        let mut state = CandidateState::Pending;
        debug!(candidate = %candidate.id, ?state, "{} strategies", candidate.strategies.len());

        state = CandidateState::Racing;
        debug!(candidate = %candidate.id, ?state);

        let runs = candidate
            .strategies
            .iter()
            .map(|strategy| self.attempt(provider, candidate, strategy, ctx));
        let attempts = join_all(runs).await;

        let winner = attempts
            .iter()
            .filter_map(|a| match &a.outcome {
                AttemptOutcome::Success { url, probe } => Some(ResolvedLink {
                    url: url.clone(),
                    strategy: a.strategy_name.clone(),
                    priority: a.priority,
                    probe: probe.clone(),
                }),
                AttemptOutcome::Fail(_) => None,
            })
            .min_by_key(|link| link.priority);

        state = if winner.is_some() {
            CandidateState::Resolved
        } else {
            CandidateState::Dropped
        };

        match &winner {
            Some(link) => info!(
                candidate = %candidate.id,
                ?state,
                "Resolved via '{}' (priority {}), {}/{} strategies validated",
                link.strategy,
                link.priority,
                attempts.iter().filter(|a| a.is_success()).count(),
                attempts.len()
            ),
            None => info!(candidate = %candidate.id, ?state, "No strategy validated"),
        }

        RaceReport {
            candidate_id: candidate.id.clone(),
            state,
            attempts,
            winner,
        }
    }

    async fn attempt(
        &self,
        provider: &dyn HostProvider,
        candidate: &Candidate,
        strategy: &Strategy,
        ctx: &ProviderContext,
    ) -> ResolutionAttempt {
        let outcome = match self.run_strategy(provider, candidate, strategy, ctx).await {
            Ok((url, probe)) => AttemptOutcome::Success { url, probe },
            Err(e) => {
                debug!(candidate = %candidate.id, "{e}");
                AttemptOutcome::Fail(e)
            }
        };

        ResolutionAttempt {
            candidate_id: candidate.id.clone(),
            strategy_name: strategy.name.clone(),
            priority: strategy.priority,
            outcome,
        }
    }

    async fn run_strategy(
        &self,
        provider: &dyn HostProvider,
        candidate: &Candidate,
        strategy: &Strategy,
        ctx: &ProviderContext,
    ) -> Result<(String, Probe), ResolveError> {
        let fail = |reason: String| ResolveError::Strategy {
            strategy: strategy.name.clone(),
            reason,
        };

        let call = AssertUnwindSafe(provider.resolve_strategy(candidate, strategy, ctx)).catch_unwind();
        let resolved = tokio::time::timeout(self.strategy_timeout, call)
            .await
            .map_err(|_| fail(format!("timed out after {:?}", self.strategy_timeout)))?
            .map_err(|payload| {
                let reason = panic_message(payload.as_ref());
                warn!(candidate = %candidate.id, strategy = %strategy.name, "Provider panicked: {reason}");
                fail(format!("panicked: {reason}"))
            })?
            .map_err(|e| fail(format!("{e:#}")))?;

        let url = match resolved {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => return Err(fail("no URL returned".to_string())),
        };

        let probe = self.validator.probe(&url, &candidate.headers).await;
        if !probe.valid {
            return Err(ResolveError::Validation {
                url,
                status: probe.status,
            });
        }

        Ok((url, probe))
    }
}

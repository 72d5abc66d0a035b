//! Concurrent fan-out dispatch across the provider catalog.

use std::future::Future;
use std::time::Duration;

use futures::future;

use crate::caller::{self, AttemptFailure, CallOutcome, RouteSuccess};
use crate::catalog::ProviderCatalog;
use crate::config::Provider;

/// One failed attempt, tagged with the provider and its retry index.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub provider: String,
    pub attempt: usize,
    pub reason: AttemptFailure,
}

/// Every attempt of a route invocation failed.
///
/// Carries one record per attempt so callers can see exactly why each
/// provider was unusable. An empty record list means the catalog had no
/// providers, so no attempts were scheduled at all.
#[derive(Debug, Clone)]
pub struct RoutingFailure {
    pub failures: Vec<FailureRecord>,
}

impl std::fmt::Display for RoutingFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no providers configured, no attempts made");
        }
        writeln!(f, "all {} attempts failed:", self.failures.len())?;
        for record in &self.failures {
            writeln!(
                f,
                "  {} (attempt {}): {}",
                record.provider, record.attempt, record.reason
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for RoutingFailure {}

/// The single result of one route invocation.
pub type RouteResult = std::result::Result<RouteSuccess, RoutingFailure>;

/// Launch every attempt concurrently and collect outcomes in scheduling order.
///
/// Attempts are scheduled catalog order first, retry index second, and the
/// ordered join returns outcomes in that same order regardless of which
/// attempt finished first. Generic over the attempt function so the dispatch
/// logic is testable without a network.
async fn fan_out<'a, F, Fut>(
    providers: &'a [Provider],
    retries_per_provider: usize,
    attempt: F,
) -> Vec<CallOutcome>
where
    F: Fn(&'a Provider, usize) -> Fut,
    Fut: Future<Output = CallOutcome>,
{
    let mut attempts = Vec::with_capacity(providers.len() * retries_per_provider);
    for provider in providers {
        for retry in 0..retries_per_provider {
            attempts.push(attempt(provider, retry));
        }
    }
    future::join_all(attempts).await
}

/// Scan outcomes in scheduling order and pick the first success.
///
/// Because the catalog is cost-sorted and the join is ordered, the cheapest
/// provider's earliest successful attempt always wins, even if a pricier
/// attempt happened to finish sooner on the wire. Repeated runs with
/// identical provider responses resolve identically.
fn resolve(outcomes: Vec<CallOutcome>, retries_per_provider: usize) -> RouteResult {
    let mut failures = Vec::new();

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            CallOutcome::Success(success) => {
                tracing::info!(
                    model = %success.model_used,
                    tokens = success.token_count,
                    cost = success.cost,
                    "Selected winning response"
                );
                return Ok(success);
            }
            CallOutcome::Failure { provider, reason } => {
                failures.push(FailureRecord {
                    provider,
                    attempt: index % retries_per_provider,
                    reason,
                });
            }
        }
    }

    Err(RoutingFailure { failures })
}

/// Routes a prompt across the catalog: fire all attempts, take the first
/// usable response in cost order.
#[derive(Debug, Clone)]
pub struct Router {
    catalog: ProviderCatalog,
    client: reqwest::Client,
}

impl Router {
    /// Create a router over an explicitly constructed catalog.
    pub fn new(catalog: ProviderCatalog) -> Self {
        Self {
            catalog,
            client: reqwest::Client::new(),
        }
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    /// Dispatch `prompt` to every provider concurrently and resolve a winner.
    ///
    /// Schedules `retries_per_provider` attempts per provider, all launched
    /// at once, then joins on all of them. In-flight attempts are not
    /// cancelled when an earlier-scheduled one succeeds; the latency floor is
    /// the slowest attempt, bounded by the per-attempt timeout. Attempt
    /// failures never escape as errors; if nothing succeeds the caller gets a
    /// `RoutingFailure` value enumerating every failure.
    pub async fn route(&self, prompt: &str) -> RouteResult {
        let retries = self.catalog.routing().retries_per_provider;
        let timeout = Duration::from_secs(self.catalog.routing().attempt_timeout_secs);

        tracing::info!(
            providers = self.catalog.len(),
            attempts = self.catalog.len() * retries,
            "Dispatching prompt across providers"
        );

        let outcomes = fan_out(self.catalog.providers(), retries, |provider, _retry| {
            caller::call(&self.client, provider, prompt, timeout)
        })
        .await;

        resolve(outcomes, retries)
    }
}

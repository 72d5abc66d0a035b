//! Single-attempt provider calls.
//!
//! One call = one bounded HTTP POST to one provider. Every fault a call can
//! hit (timeout, bad status, unusable body, network error) is folded into the
//! `CallOutcome` it returns, so a failing attempt can never abort the sibling
//! attempts launched alongside it.

use std::time::Duration;

use reqwest::header;
use serde_json::Value;

use crate::config::Provider;
use crate::cost::estimate_tokens_and_cost;

/// Why a single attempt failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AttemptFailure {
    #[error("attempt timed out")]
    Timeout,

    #[error("provider returned HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("provider returned no response text")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

/// The winning payload of a route: the chosen response plus its price tag.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSuccess {
    pub model_used: String,
    pub cost: f64,
    pub token_count: u32,
    pub response_text: String,
}

/// Result of one attempt against one provider.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Success(RouteSuccess),
    Failure {
        provider: String,
        reason: AttemptFailure,
    },
}

impl CallOutcome {
    fn failure(provider: &Provider, reason: AttemptFailure) -> Self {
        tracing::warn!(
            provider = %provider.name,
            reason = %reason,
            "Provider attempt failed"
        );
        CallOutcome::Failure {
            provider: provider.name.clone(),
            reason,
        }
    }
}

/// Pull the generated text out of a provider response body.
///
/// Prefers a top-level `response` string; falls back to `choices[0].text`.
/// Empty strings in either spot count as absent, matching providers that
/// send `"response": ""` alongside a populated `choices` list.
fn extract_response_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("response").and_then(Value::as_str) {
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("text"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Issue one bounded call to `provider` and classify the result.
///
/// The timeout covers the whole attempt: connection, request, and body read.
pub async fn call(
    client: &reqwest::Client,
    provider: &Provider,
    prompt: &str,
    timeout: Duration,
) -> CallOutcome {
    match tokio::time::timeout(timeout, call_inner(client, provider, prompt)).await {
        Ok(outcome) => outcome,
        Err(_) => CallOutcome::failure(provider, AttemptFailure::Timeout),
    }
}

async fn call_inner(client: &reqwest::Client, provider: &Provider, prompt: &str) -> CallOutcome {
    let payload = serde_json::json!({ "prompt": prompt });

    let response = match client
        .post(&provider.endpoint)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", provider.api_key.expose_secret()),
        )
        .json(&payload)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            return CallOutcome::failure(provider, AttemptFailure::Timeout);
        }
        Err(e) => {
            return CallOutcome::failure(
                provider,
                AttemptFailure::Other(format!("request failed: {}", e)),
            );
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return CallOutcome::failure(
            provider,
            AttemptFailure::HttpStatus {
                code: status.as_u16(),
                body,
            },
        );
    }

    let body: Value = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            return CallOutcome::failure(
                provider,
                AttemptFailure::Other(format!("failed to parse response body: {}", e)),
            );
        }
    };

    let Some(response_text) = extract_response_text(&body) else {
        return CallOutcome::failure(provider, AttemptFailure::EmptyResponse);
    };

    let (token_count, cost) =
        estimate_tokens_and_cost(&response_text, provider.cost_per_1k_tokens);

    tracing::debug!(
        provider = %provider.name,
        tokens = token_count,
        cost = cost,
        "Provider attempt succeeded"
    );

    CallOutcome::Success(RouteSuccess {
        model_used: provider.name.clone(),
        cost,
        token_count,
        response_text,
    })
}

//! Token and cost estimation.
//!
//! Pure functions only: no I/O, no shared state, deterministic for a given
//! input. The router prices every winning response through here.

/// Rough chars-per-token ratio for English text.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` and its cost at `cost_per_1k_tokens`.
///
/// The token heuristic is ceil(chars / 4) with a floor of one token for
/// non-empty text. Cost is `tokens / 1000 * cost_per_1k_tokens`.
pub fn estimate_tokens_and_cost(text: &str, cost_per_1k_tokens: f64) -> (u32, f64) {
    let chars = text.chars().count();
    let tokens = if chars == 0 {
        0
    } else {
        chars.div_ceil(CHARS_PER_TOKEN) as u32
    };
    let cost = f64::from(tokens) / 1000.0 * cost_per_1k_tokens;
    (tokens, cost)
}

//! Router module for concurrent provider dispatch.
//!
//! This module owns the fan-out algorithm: every provider in the catalog gets
//! a fixed number of concurrent attempts, outcomes are joined in scheduling
//! order, and the first success in that order wins.

mod dispatch;

pub use dispatch::{FailureRecord, RouteResult, Router, RoutingFailure};

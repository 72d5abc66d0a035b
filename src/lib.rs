//! fanroute - Cost-ordered concurrent fan-out routing for LLM providers
//!
//! This library dispatches a prompt to every configured text-generation
//! provider concurrently and returns the first usable response in cost
//! order, with token usage and monetary cost attached.

pub mod caller;
pub mod catalog;
pub mod config;
pub mod cost;
pub mod error;
pub mod router;

pub use caller::{AttemptFailure, CallOutcome, RouteSuccess};
pub use catalog::ProviderCatalog;
pub use config::{Config, Provider};
pub use error::{Error, Result};
pub use router::{RouteResult, Router, RoutingFailure};

//! llm-relay: forwards chat requests from a front-end to Gemini or OpenAI.
//!
//! Outbound provider traffic is routed according to `HTTPS_PROXY`,
//! `HTTP_PROXY` and `NO_PROXY`, re-read for every request; see [`proxy`].

pub mod config;
pub mod defaults;
pub mod doctor;
pub mod error;
pub mod models;
pub mod providers;
pub mod proxy;
pub mod server;

pub use error::{ApiError, ProviderError};
pub use proxy::{resolve, ProxyConfig, ProxyDecision, ProxyEnv};

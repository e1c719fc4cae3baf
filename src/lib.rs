//! One-Prompt Builder: turns a single natural-language prompt into website and
//! mobile app projects via an LLM completion service, keeps their version
//! history, and publishes them to hosting platforms.

pub mod auth;
pub mod completion;
pub mod config;
pub mod deploy;
pub mod error;
pub mod export;
pub mod generator;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod parser;
pub mod routes;
pub mod store;

pub use error::AppError;
pub use routes::{AppState, app};

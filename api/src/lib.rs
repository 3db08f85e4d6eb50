//! Service clients for the diagram editor.
//!
//! Everything that talks to the network lives here: the HTTP client for the
//! validation, cost, artifact and registry services, its retry policy and
//! configuration, and the debounced validation pipeline that keeps
//! per-entity diagnostics in step with the live graph. Results never touch the
//! entity store directly; the host feeds them to
//! [`canvas::engine::EngineCore::apply_validation`], which discards anything
//! issued against an older graph generation.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`client`] | [`client::ApiClient`] and endpoint paths |
//! | [`config`] | [`config::ApiConfig`] loaded from `STACKBOARD_*` env vars |
//! | [`error`] | [`error::ApiError`] with stable codes and retry classification |
//! | [`retry`] | Bounded exponential back-off |
//! | [`types`] | Request/response wire types |
//! | [`validation`] | Debounce core and the validation pipeline task |

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod types;
pub mod validation;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use error::{ApiError, ErrorCode};

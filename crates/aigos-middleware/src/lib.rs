//! aigos-middleware
//!
//! The framework-neutral A2A request-verification pipeline: extract the
//! bearer token from a configured header, derive the action name, verify
//! the token, evaluate trust, and attach a tagged outcome. Express- or
//! Axum-style adapters are thin wrappers outside this crate; the pipeline
//! itself is purely functional over (headers, request metadata) with only
//! the injected verifier, evaluator, and immutable policy as state.

pub mod pipeline;

pub use pipeline::{
    error_body, A2aMiddleware, Failure, FailureCode, InboundRequest, Outcome, VerifiedRequest,
};

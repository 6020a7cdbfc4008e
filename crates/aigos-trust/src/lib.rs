//! aigos-trust
//!
//! Trust decisions for inbound A2A requests, and the layered
//! governance-policy graph behind them: glob-pattern action rules, the
//! ordered trust evaluation pipeline, circular-safe policy inheritance
//! resolution, and scored policy selection with an LRU cache.
//!
//! Rule-ordering contract, visible to policy authors: action rules match in
//! document order and the first match wins; policy selection scores every
//! candidate and breaks ties by document order.

pub mod evaluator;
pub mod pattern;
pub mod resolve;
pub mod select;

pub use evaluator::{EvaluationRequest, TrustDecision, TrustEvaluator};
pub use pattern::ActionPattern;
pub use resolve::{resolve, PolicyRepository};
pub use select::{PolicySelector, Selection};

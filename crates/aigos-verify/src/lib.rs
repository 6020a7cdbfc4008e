//! aigos-verify
//!
//! The verification engine: runs a registered battery of governance checks
//! against an asset at a target CGA level and produces the report that
//! certificate issuance consumes. Also home to the kill-switch live-test
//! sub-protocol.

pub mod checks;
pub mod context;
pub mod engine;
pub mod killswitch;

pub use checks::{Check, CheckRegistry};
pub use context::{AssetCard, CardValidator, PolicyProbe, VerificationContext};
pub use engine::Verifier;
pub use killswitch::{
    Aggregate, ChannelKind, ChannelReport, KillSwitchChannel, LiveTestConfig, TestCommand,
};

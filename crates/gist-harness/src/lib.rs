//! Deterministic harness for the Gist client.
//!
//! Seeded [`SimEnv`] on tokio's paused clock, scripted network seams and a
//! recording collaborator, so retry, heartbeat and polling timing can be
//! tested without wall-clock waits or sockets.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks store transitions against properties that
//! must hold after any action sequence. Use [`InvariantRegistry::standard()`]
//! for the common store invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod recorder;
pub mod rig;
pub mod sim_env;
pub mod sim_transport;

pub use invariants::{
    EmbeddedKeyedByElement, Invariant, InvariantRegistry, InvariantResult, ModalNeverInline,
    QueueExcludesShown, ShownIdsPersist, Transition, Violation,
};
pub use recorder::Recorder;
pub use rig::{Rig, settle};
pub use sim_env::SimEnv;
pub use sim_transport::{OpenBehavior, ScriptedPolling, ScriptedTransport};

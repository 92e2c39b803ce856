//! Generative backend seam.
//!
//! The pipeline talks to a text model only through the [`GenerativeBackend`]
//! trait. [`GeminiBackend`] is the production adapter; [`ScriptedBackend`]
//! replays canned responses. [`generate_with_retry`] wraps any backend in
//! the configured retry policy.
//!
//! ```text
//! recommend_training_plans
//!     |
//!     v
//! generate_with_retry --(transient? backoff, retry)--> &dyn GenerativeBackend
//!                                                         |-- GeminiBackend
//!                                                         `-- ScriptedBackend
//! ```

pub mod gemini;
pub mod retry;
pub mod scripted;
pub mod trait_def;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use retry::generate_with_retry;
pub use scripted::ScriptedBackend;
pub use trait_def::{BackendError, GenerationRequest, GenerativeBackend};

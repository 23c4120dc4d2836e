//! Model-assisted restructuring.
//!
//! Each slide becomes a prompt, the prompt goes to a language-model backend,
//! and the reply is decoded into a [`deck_core::RestructuredRecord`]. Any
//! failure along the way yields a degraded record built from the slide itself.

pub mod backend;
pub mod prompt;
pub mod response;
pub mod restructurer;

pub use backend::{Backend, CompletionBackend, LocalBackend, RemoteBackend, REQUEST_TIMEOUT};
pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use response::{extract_json_block, parse_reply, ParsedReply};
pub use restructurer::{DegradeReason, RestructureOutcome, Restructurer, PARSE_FAILURE_SUMMARY};

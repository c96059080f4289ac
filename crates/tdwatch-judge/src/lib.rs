//! Client for the judgment capability: an OpenAI-compatible chat-completions
//! endpoint asked to answer in JSON.
//!
//! The client owns transport concerns only (auth, timeout, transient retry,
//! JSON extraction). Prompt content and the shape of the answer belong to the
//! caller.

pub mod client;
pub mod error;
pub mod extract;
pub(crate) mod retry;
pub mod types;

pub use client::{JudgeClient, JudgeConfig};
pub use error::JudgeError;
pub use extract::{extract_json_block, parse_json_content};

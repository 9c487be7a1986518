//! Optional hint advisor backed by a remote language model.

pub mod client;
pub mod prompt;
pub mod suggestion;

pub use client::{request_hint, AdvisorConfig, AdvisorError, HintGate, HintTicket};
pub use prompt::{build_prompt, describe_board, ruleset_text};
pub use suggestion::{
    parse_reply, AdvisorHint, AdvisorReply, SuggestedAction, Suggestion, SuggestionError,
};

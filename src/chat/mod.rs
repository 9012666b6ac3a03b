//! Keyword-driven chat replies for end clients.

mod intents;
mod responder;

pub use intents::{Intent, IntentError, IntentMatcher, IntentRule};
pub use responder::{render, ChatReply, ChatResponder, APOLOGY};

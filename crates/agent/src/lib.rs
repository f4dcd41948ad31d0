//! The receptionist turn: one user message in, one answer out.
//!
//! A turn makes at most two model calls:
//!
//! 1. **Build context** from the session history and the caller's profile
//! 2. **Generate** with every registered tool declared
//! 3. **If tool requests**: execute them, then generate once more with the
//!    outputs folded into the prompt and no tools declared
//! 4. **Sanitize** leaked tool-output dumps out of the final text
//!
//! Failures never escape a turn; they become an apology answer.

pub mod context;
pub mod orchestrator;
pub mod sanitize;

#[cfg(test)]
mod test_helpers;

pub use context::ContextBuilder;
pub use orchestrator::{
    FALLBACK_TEXT, SYSTEM_PROMPT, TurnOrchestrator, TurnPhase, TurnResult, build_followup_prompt, build_prompt,
};
pub use sanitize::sanitize;

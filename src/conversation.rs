//! Conversation transcript and the turn-taking protocol around the model
//!
//! The transcript is owned by one session and only ever grows. Every request
//! re-derives the wire history from it, leaving out the turn being sent.

mod assembler;
mod mapper;
mod message;
mod store;

#[cfg(test)]
mod proptests;

pub use assembler::ResponseAssembler;
pub use mapper::{map_history, MappedTurn};
pub use message::{Message, Role};
pub use store::ConversationStore;

#[cfg(test)]
pub use assembler::{AssemblerState, Finalized, FALLBACK_TEXT, TYPING_INDICATOR};
#[cfg(test)]
pub use mapper::ExternalRole;

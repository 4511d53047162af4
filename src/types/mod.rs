//! Core domain types for the relay.
//!
//! Identifier newtypes plus the one record every output line must be.

pub mod ids;
pub mod message;

// Re-export commonly used types at the module level
pub use ids::{ChannelId, ClientMsgId, EventTs};
pub use message::CleanMessage;

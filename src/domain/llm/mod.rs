//! Conversation messages and normalized generative-model responses

mod message;
mod response;

pub use message::{join_role, Message, MessageRole};
pub use response::{Response, TokenPricing};

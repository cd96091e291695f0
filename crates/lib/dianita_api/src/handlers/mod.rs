//! Request handlers.

pub mod auth;
pub mod chat;
pub mod chats;
pub mod preferences;

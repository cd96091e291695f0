//! Business-flow services sitting between handlers and `dianita_core`.

pub mod auth;
pub mod chat;
pub mod cookies;

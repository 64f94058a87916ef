//! HTTP handlers for groundwork-api.

pub mod chat;
pub mod health;
pub mod sync;

pub use chat::chat;
pub use health::health_check;
pub use sync::sync_source;

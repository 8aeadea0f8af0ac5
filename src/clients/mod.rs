//! External service clients
//!
//! Everything the core consumes but does not own: the mail provider,
//! the Microsoft Graph directory, and the breach intelligence feed.

pub mod breach;
pub mod graph;
pub mod mailer;

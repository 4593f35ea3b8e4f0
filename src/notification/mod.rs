//! Messaging-platform boundary: outbound prompt posting and inbound
//! event verification/translation.

pub mod events;
pub mod slack;

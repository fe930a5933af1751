//! Core data model: addresses, message sources and envelopes, the attachment
//! listing, and the outgoing draft.

pub mod address;
pub mod attachment;
pub mod mail;

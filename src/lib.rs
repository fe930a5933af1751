//! `mboxsend`: bounce, resend, forward and reply from a message's
//! attachment listing.
//!
//! The library turns a selection inside a flattened MIME attachment listing
//! (one focused part, or every tagged part) into an outgoing draft, and
//! hands it to a send pipeline.

pub mod commands;
pub mod compose;
pub mod config;
pub mod error;
pub mod i18n;
pub mod model;
pub mod outbox;
pub mod parser;
pub mod selection;
pub mod ui;

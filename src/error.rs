//! Centralized error types for mboxsend.

use std::path::PathBuf;
use thiserror::Error;

use crate::i18n;

/// The command a precondition failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Bounce,
    Resend,
    Forward,
    Reply,
    MailSender,
}

/// All errors produced by the mboxsend library.
#[derive(Error, Debug)]
pub enum SendError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The selection contains a part that is not an embedded message.
    #[error("{}", not_message_text(.0))]
    NotMessagePart(Command),

    /// No part is focused and nothing is tagged.
    #[error("{}", i18n::err_nothing_selected())]
    NothingSelected,

    /// The focused entry does not exist in the listing.
    #[error("{} #{}", i18n::err_no_such_part(), .0)]
    NoSuchPart(usize),

    /// The recipient line could not be parsed into addresses.
    #[error("{}", i18n::err_address_parse())]
    AddressParse,

    /// A domain could not be converted to its ASCII form.
    #[error("{}", i18n::err_bad_idn(.0))]
    BadIdn(String),

    /// A list reply found no mailing-list recipients.
    #[error("{}", i18n::err_no_lists())]
    NoMailingLists,

    /// A reply could not find a single message header to work from.
    #[error("{}", i18n::err_no_tagged_messages())]
    NoTaggedMessages,

    /// The temporary draft body could not be created.
    #[error("{}: {source}", i18n::err_temp_file(.path))]
    TempFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An attachment entry points outside its backing message.
    #[error("Part at {start}..{end} lies outside '{source_name}' ({len} bytes)")]
    PartOutOfRange {
        source_name: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// A MIME decoding error.
    #[error("MIME decoding error: {0}")]
    Mime(String),

    /// At least one message of a bounce failed.
    #[error("{}", bouncing_text(.plural))]
    BounceFailed { plural: bool },

    /// At least one message of a resend failed.
    #[error("{}", resending_text(.plural))]
    ResendFailed { plural: bool },

    /// The user aborted a prompt.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// The send pipeline rejected a draft.
    #[error("Send error: {0}")]
    Send(String),
}

fn not_message_text(command: &Command) -> &'static str {
    match command {
        Command::MailSender => i18n::err_compose_to_sender_only_messages(),
        _ => i18n::err_bounce_only_messages(),
    }
}

fn bouncing_text(plural: &bool) -> &'static str {
    i18n::err_bouncing(!*plural)
}

fn resending_text(plural: &bool) -> &'static str {
    i18n::err_resending(!*plural)
}

/// Convenience alias for `Result<T, SendError>`.
pub type Result<T> = std::result::Result<T, SendError>;

impl SendError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (writes into an already-open draft body).
impl From<std::io::Error> for SendError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<draft>"),
            source,
        }
    }
}

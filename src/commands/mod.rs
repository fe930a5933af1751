//! The attachment-menu commands: bounce, resend, forward, reply and
//! compose-to-sender.
//!
//! Every command acts on the focused entry of an [`AttachmentIndex`] or, when
//! nothing is focused, on all tagged entries. The enclosing message and the
//! backing sources travel inside the index (`root_header` and the per-entry
//! sources).

pub mod bounce;
pub mod forward;
pub mod reply;
pub mod resend;
pub mod sender;

use tracing::{debug, warn};

use crate::compose::envelope::SendFlags;
use crate::config::Config;
use crate::error::{Result, SendError};
use crate::model::attachment::AttachmentEntry;
use crate::model::attachment::AttachmentIndex;
use crate::model::mail::MessageHeader;
use crate::outbox::{Mailbox, Transport};
use crate::ui::Ui;

pub use bounce::bounce;
pub use forward::forward;
pub use reply::reply;
pub use resend::resend;
pub use sender::mail_sender;

/// The collaborators a command talks to.
pub struct Session<'a> {
    pub config: &'a Config,
    pub ui: &'a mut dyn Ui,
    pub transport: &'a mut dyn Transport,
    pub mailbox: &'a mut dyn Mailbox,
}

/// A command to run against an attachment listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Bounce,
    Resend,
    Forward,
    /// Reply with the given recipient scope (`REPLY`, `GROUP_REPLY` or
    /// `LIST_REPLY`).
    Reply(SendFlags),
    MailSender,
}

/// Run `action` and report any failure through the UI.
///
/// Returns `false` if the command failed. A cancelled prompt is a clean
/// abort and is not reported.
pub fn run(
    session: &mut Session<'_>,
    action: Action,
    index: &AttachmentIndex,
    focused: Option<usize>,
) -> bool {
    debug!(?action, ?focused, entries = index.len(), "Running command");
    let result = match action {
        Action::Bounce => bounce(session, index, focused),
        Action::Resend => resend(session, index, focused),
        Action::Forward => forward(session, index, focused),
        Action::Reply(flags) => reply(session, index, focused, flags),
        Action::MailSender => mail_sender(session, index, focused),
    };
    match result {
        Ok(()) | Err(SendError::Cancelled) => true,
        Err(e) => {
            warn!(?action, error = %e, "Command failed");
            session.ui.error(&e.to_string());
            false
        }
    }
}

/// The parsed header of a message-typed entry.
pub(crate) fn message_of(entry: &AttachmentEntry) -> Result<&MessageHeader> {
    entry.part.message.as_ref().ok_or_else(|| {
        SendError::Mime(format!(
            "{}: {} part has no parsed header",
            entry.source.name,
            entry.part.content_type()
        ))
    })
}

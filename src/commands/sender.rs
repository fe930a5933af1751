//! Compose a new message to the senders of embedded messages.

use tracing::debug;

use super::{message_of, Session};
use crate::compose::envelope::{fetch_recips, SendFlags};
use crate::error::{Command, Result};
use crate::model::attachment::AttachmentIndex;
use crate::model::mail::Draft;
use crate::selection::{require_all_messages, Target};

/// Start an empty draft addressed to the sender of every message in scope.
pub fn mail_sender(session: &mut Session<'_>, index: &AttachmentIndex, focused: Option<usize>) -> Result<()> {
    let target = Target::resolve(index, focused)?;
    require_all_messages(index, target.focused(), Command::MailSender)?;

    let mut draft = Draft::new();
    for (_, entry) in target.entries(index) {
        let message = message_of(entry)?;
        fetch_recips(
            &mut draft.envelope,
            &message.envelope,
            SendFlags::TO_SENDER,
            session.config,
            session.ui,
        )?;
    }
    debug!(to = draft.envelope.to.len(), "Composing to sender");
    session.transport.send(SendFlags::TO_SENDER, draft, None, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{message_entry, Recorder, ScriptedUi};
    use crate::commands::Session;
    use crate::config::Config;
    use crate::error::SendError;

    #[test]
    fn test_collects_every_sender() {
        let mut idx = crate::selection::tests::listing(&[]);
        idx.entries = vec![
            message_entry("From: Alice <alice@example.com>\n\none\n", 0, true),
            message_entry("From: bob@example.com\n\ntwo\n", 0, true),
        ];
        let config = Config::default();
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        let mut mailbox = Recorder::default();
        let mut session = Session {
            config: &config,
            ui: &mut ui,
            transport: &mut rec,
            mailbox: &mut mailbox,
        };
        mail_sender(&mut session, &idx, None).unwrap();

        let sent = &rec.sent[0];
        assert_eq!(sent.flags, SendFlags::TO_SENDER);
        assert!(sent.body.is_none());
        let to: Vec<&str> = sent.draft.envelope.to.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(to, vec!["alice@example.com", "bob@example.com"]);
    }

    #[test]
    fn test_plain_part_reports_compose_error() {
        let idx = crate::selection::tests::listing(&[(0, "text/plain", false)]);
        let config = Config::default();
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        let mut mailbox = Recorder::default();
        let mut session = Session {
            config: &config,
            ui: &mut ui,
            transport: &mut rec,
            mailbox: &mut mailbox,
        };
        let err = mail_sender(&mut session, &idx, Some(0)).unwrap_err();
        assert!(matches!(err, SendError::NotMessagePart(Command::MailSender)));
        assert_eq!(
            err.to_string(),
            "You may only compose to sender with message/rfc822 parts."
        );
        assert!(rec.sent.is_empty());
    }
}

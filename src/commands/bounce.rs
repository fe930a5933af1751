//! Bounce (redirect) embedded messages to new recipients.

use tracing::{info, warn};

use super::{message_of, Session};
use crate::error::{Command, Result, SendError};
use crate::i18n;
use crate::model::address::{expand_aliases, format_list, parse_recipients, to_intl};
use crate::model::attachment::AttachmentIndex;
use crate::model::mail::MessageHeader;
use crate::selection::{require_all_messages, Target};
use crate::ui::{fit_prompt, query_quadoption, Answer};

/// Columns of the message line kept free next to the confirmation.
const CONFIRM_RESERVE: usize = 15 + 7 + 2;

/// Bounce every message in scope.
///
/// An empty or aborted recipient line returns quietly; a declined
/// confirmation reports that nothing was bounced. A failure on one message
/// does not stop the others, but turns the outcome into
/// [`SendError::BounceFailed`].
pub fn bounce(session: &mut Session<'_>, index: &AttachmentIndex, focused: Option<usize>) -> Result<()> {
    let target = Target::resolve(index, focused)?;
    require_all_messages(index, target.focused(), Command::Bounce)?;
    let single = target.is_single(index);

    let messages = target
        .entries(index)
        .into_iter()
        .map(|(_, entry)| message_of(entry))
        .collect::<Result<Vec<&MessageHeader>>>()?;

    if messages.iter().any(|m| m.envelope.from.is_empty()) {
        session.ui.error(i18n::warn_no_from());
        session.ui.pause();
    }

    let Some(line) = session.ui.get_field(i18n::prompt_bounce_to(single)) else {
        return Ok(());
    };
    if line.trim().is_empty() {
        return Ok(());
    }

    let recipients = parse_recipients(&line)?;
    let mut recipients = expand_aliases(recipients, &session.config.aliases);
    to_intl(&mut recipients)?;

    let text = i18n::prompt_bounce_confirm(single, &format_list(&recipients));
    let width = session.ui.columns().saturating_sub(CONFIRM_RESERVE);
    let prompt = fit_prompt(&text, width, "?", "...?");
    if query_quadoption(session.ui, session.config.quadoptions.bounce, &prompt) != Answer::Yes {
        session.ui.message(i18n::msg_not_bounced(single));
        return Ok(());
    }

    let mut failed = false;
    for message in &messages {
        if let Err(e) = session.transport.bounce(message, &recipients) {
            warn!(source = %message.source.name, error = %e, "Bounce failed");
            failed = true;
        }
    }
    if failed {
        return Err(SendError::BounceFailed { plural: !single });
    }

    info!(count = messages.len(), to = %format_list(&recipients), "Bounced messages");
    session.ui.message(i18n::msg_bounced(single));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{message_entry, Recorder, ScriptedUi};
    use crate::commands::Session;
    use crate::config::Config;
    use crate::model::mail::MessageSource;

    const M1: &str = "From: alice@example.com\nMessage-ID: <m1@x>\nSubject: one\n\nbody one\n";
    const M2: &str = "From: bob@example.com\nMessage-ID: <m2@x>\nSubject: two\n\nbody two\n";
    const NO_FROM: &str = "Message-ID: <m3@x>\nSubject: three\n\nbody\n";

    fn index(rows: Vec<crate::model::attachment::AttachmentEntry>) -> AttachmentIndex {
        AttachmentIndex {
            entries: rows,
            root_source: MessageSource::new("mem", Vec::new()),
            root_header: None,
        }
    }

    fn run_bounce(
        ui: &mut ScriptedUi,
        rec: &mut Recorder,
        index: &AttachmentIndex,
        focused: Option<usize>,
    ) -> Result<()> {
        let config = Config::default();
        let mut mailbox = Recorder::default();
        let mut session = Session {
            config: &config,
            ui,
            transport: rec,
            mailbox: &mut mailbox,
        };
        bounce(&mut session, index, focused)
    }

    #[test]
    fn test_bounce_tagged_reports_plural() {
        let idx = index(vec![message_entry(M1, 0, true), message_entry(M2, 0, true)]);
        let mut ui = ScriptedUi::default();
        ui.fields.push_back(Some("carol@example.com".to_string()));
        let mut rec = Recorder::default();
        run_bounce(&mut ui, &mut rec, &idx, None).unwrap();

        assert_eq!(ui.prompts[0], "Bounce tagged messages to: ");
        assert_eq!(ui.prompts[1], "Bounce messages to carol@example.com?");
        assert_eq!(ui.messages, vec!["Messages bounced.".to_string()]);
        assert_eq!(rec.bounced.len(), 2);
    }

    #[test]
    fn test_bounce_single_tagged_is_singular() {
        let idx = index(vec![message_entry(M1, 0, true), message_entry(M2, 0, false)]);
        let mut ui = ScriptedUi::default();
        ui.fields.push_back(Some("carol@example.com".to_string()));
        let mut rec = Recorder::default();
        run_bounce(&mut ui, &mut rec, &idx, None).unwrap();
        assert_eq!(ui.prompts[0], "Bounce message to: ");
        assert_eq!(ui.messages, vec!["Message bounced.".to_string()]);
        assert_eq!(rec.bounced.len(), 1);
    }

    #[test]
    fn test_bounce_rejects_plain_part() {
        let mut idx = crate::selection::tests::listing(&[(0, "text/plain", true)]);
        idx.entries.push(message_entry(M1, 0, true));
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        let err = run_bounce(&mut ui, &mut rec, &idx, None).unwrap_err();
        assert!(matches!(err, SendError::NotMessagePart(Command::Bounce)));
        assert!(ui.prompts.is_empty());
    }

    #[test]
    fn test_empty_recipient_line_is_silent() {
        let idx = index(vec![message_entry(M1, 0, false)]);
        let mut ui = ScriptedUi::default();
        ui.fields.push_back(Some("   ".to_string()));
        let mut rec = Recorder::default();
        run_bounce(&mut ui, &mut rec, &idx, Some(0)).unwrap();
        assert!(ui.messages.is_empty());
        assert!(rec.bounced.is_empty());
    }

    #[test]
    fn test_bad_address_is_error() {
        let idx = index(vec![message_entry(M1, 0, false)]);
        let mut ui = ScriptedUi::default();
        ui.fields.push_back(Some("\"unbalanced <x@y>".to_string()));
        let mut rec = Recorder::default();
        let err = run_bounce(&mut ui, &mut rec, &idx, Some(0)).unwrap_err();
        assert!(matches!(err, SendError::AddressParse));
    }

    #[test]
    fn test_declined_confirmation() {
        let idx = index(vec![message_entry(M1, 0, false)]);
        let mut ui = ScriptedUi::default();
        ui.fields.push_back(Some("carol@example.com".to_string()));
        ui.answers.push_back(Some(false));
        let mut rec = Recorder::default();
        run_bounce(&mut ui, &mut rec, &idx, Some(0)).unwrap();
        assert_eq!(ui.messages, vec!["Message not bounced.".to_string()]);
        assert!(rec.bounced.is_empty());
    }

    #[test]
    fn test_long_confirmation_is_ellipsized() {
        let idx = index(vec![message_entry(M1, 0, false)]);
        let mut ui = ScriptedUi {
            columns: 40,
            ..ScriptedUi::default()
        };
        ui.fields
            .push_back(Some("someone.with.a.long.name@example.com".to_string()));
        let mut rec = Recorder::default();
        run_bounce(&mut ui, &mut rec, &idx, Some(0)).unwrap();
        assert_eq!(ui.prompts[1], "Bounce message t...?");
    }

    #[test]
    fn test_partial_failure_continues_and_aggregates() {
        let idx = index(vec![message_entry(M1, 0, true), message_entry(M2, 0, true)]);
        let mut ui = ScriptedUi::default();
        ui.fields.push_back(Some("carol@example.com".to_string()));
        let mut rec = Recorder {
            fail_bounce: Some("<m1@x>".to_string()),
            ..Recorder::default()
        };
        let err = run_bounce(&mut ui, &mut rec, &idx, None).unwrap_err();
        assert!(matches!(err, SendError::BounceFailed { plural: true }));
        assert_eq!(err.to_string(), "Error bouncing messages!");
        assert_eq!(rec.bounced.len(), 1);
        assert!(ui.messages.is_empty());
    }

    #[test]
    fn test_missing_from_warns_once() {
        let idx = index(vec![message_entry(NO_FROM, 0, true), message_entry(NO_FROM, 0, true)]);
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        run_bounce(&mut ui, &mut rec, &idx, None).unwrap();
        assert_eq!(
            ui.errors,
            vec!["Warning: message contains no From: header".to_string()]
        );
    }
}

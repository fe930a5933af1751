//! Forward embedded messages or individual attachments.
//!
//! When every part in scope is a message the messages themselves are
//! forwarded, inline or MIME-encapsulated. Otherwise the parts are quoted
//! into a new body under the header of their common parent message, and
//! whatever cannot be shown as text is attached.

use tracing::{debug, info};

use super::{message_of, Session};
use crate::compose::envelope::{make_forward_subject, SendFlags};
use crate::compose::format::{forward_intro, forward_trailer, quote_prefix};
use crate::compose::pipeline::{attach_message, copy_body, copy_problematic_attachments, include_header};
use crate::compose::render::{copy_message, render_part, CopyFlags};
use crate::compose::{Assembled, QuotingContext, TempBody};
use crate::config::tmp_dir;
use crate::error::{Result, SendError};
use crate::i18n;
use crate::model::attachment::AttachmentIndex;
use crate::model::mail::{Draft, Envelope, MessageHeader};
use crate::selection::parent::find_parent;
use crate::selection::{all_decodable, all_messages, count_tagged, Target};
use crate::ui::{query_quadoption, Answer};

/// Forward the focused entry or the tagged entries.
pub fn forward(session: &mut Session<'_>, index: &AttachmentIndex, focused: Option<usize>) -> Result<()> {
    let target = Target::resolve(index, focused)?;

    let (assembled, reply_to) = if all_messages(index, target.focused()) {
        let messages = target
            .entries(index)
            .into_iter()
            .map(|(_, entry)| message_of(entry))
            .collect::<Result<Vec<&MessageHeader>>>()?;
        let first = messages.first().copied().ok_or(SendError::NoTaggedMessages)?;
        (forward_messages(session, &messages)?, Some(first))
    } else {
        let parent = body_parent(index, target)?;
        (forward_bodies(session, index, target, parent)?, parent)
    };

    match assembled {
        Assembled::Ready { draft, body } => {
            info!(parts = draft.parts.len(), inline = body.is_some(), "Forwarding");
            session.transport.send(SendFlags::FORWARD, draft, body, reply_to)
        }
        Assembled::Aborted => {
            session.ui.message(i18n::msg_not_forwarded());
            Ok(())
        }
    }
}

/// The message whose header frames a body forward or reply: the common
/// parent of the selection, else the enclosing message.
pub(crate) fn body_parent(index: &AttachmentIndex, target: Target) -> Result<Option<&MessageHeader>> {
    let nattach = count_tagged(index);
    match find_parent(index, target.focused(), nattach) {
        Some(p) => {
            debug!(parent = p, "Found parent message");
            message_of(&index.entries[p]).map(Some)
        }
        None => Ok(index.root_header.as_ref()),
    }
}

/// Forward whole messages: inline copies in the body, or one
/// `message/rfc822` part each.
fn forward_messages(session: &mut Session<'_>, messages: &[&MessageHeader]) -> Result<Assembled> {
    let config = session.config;
    let mut draft = Draft::new();
    if let Some(first) = messages.first() {
        make_forward_subject(&mut draft.envelope, &first.envelope, config);
    }

    let answer = query_quadoption(
        session.ui,
        config.quadoptions.mime_forward,
        i18n::prompt_forward_mime_encapsulated(),
    );
    match answer {
        Answer::Abort => Ok(Assembled::Aborted),
        Answer::Yes => {
            draft.parts.extend(messages.iter().map(|m| attach_message(m)));
            Ok(Assembled::Ready { draft, body: None })
        }
        Answer::No => {
            let mut flags = CopyFlags::XMIT;
            if config.compose.forward_decode {
                flags |= CopyFlags::DECODE | CopyFlags::CHARCONV;
                if config.compose.weed {
                    flags |= CopyFlags::WEED | CopyFlags::REORDER;
                }
            }

            let mut body = TempBody::create(&tmp_dir(config))?;
            for message in messages {
                let env = &message.envelope;
                body.write_str(&forward_intro(env, &config.compose))?;
                {
                    let mut ctx = body.context(config).with_flags(flags);
                    if config.compose.forward_quote {
                        ctx = ctx.with_prefix(quote_prefix(None, env, &config.compose));
                    }
                    copy_message(message, &mut ctx)?;
                }
                body.write_str(&forward_trailer(env, &config.compose))?;
            }
            Ok(Assembled::Ready {
                draft,
                body: Some(body.finish()?),
            })
        }
    }
}

/// Forward individual parts under the header of `parent`.
fn forward_bodies(
    session: &mut Session<'_>,
    index: &AttachmentIndex,
    target: Target,
    parent: Option<&MessageHeader>,
) -> Result<Assembled> {
    let config = session.config;
    let compose = &config.compose;
    let focused = target.focused();
    let nattach = count_tagged(index);
    let empty = Envelope::default();
    let parent_env = parent.map_or(&empty, |p| &p.envelope);

    let mut draft = Draft::new();
    make_forward_subject(&mut draft.envelope, parent_env, config);

    let mut body = TempBody::create(&tmp_dir(config))?;
    body.write_str(&forward_intro(parent_env, compose))?;

    let quoting = QuotingContext::new(config, parent_env, compose.forward_quote);
    if let Some(parent) = parent {
        include_header(
            compose.forward_quote,
            parent,
            &mut body,
            quoting.prefix.as_deref(),
            config,
        )?;
    }

    // Attach everything instead of quoting?
    let mut attach_all = false;
    if focused.map_or(true, |i| index.entries[i].part.decodable) {
        match query_quadoption(
            session.ui,
            config.quadoptions.mime_forward,
            i18n::prompt_forward_as_attachments(),
        ) {
            Answer::Yes => attach_all = true,
            Answer::No => {}
            Answer::Abort => return Ok(Assembled::Aborted),
        }
    }

    // Attach the undecodable rest?
    let mut attach_rest = true;
    if !attach_all && focused.is_none() && nattach > 1 && !all_decodable(index, None) {
        match query_quadoption(
            session.ui,
            config.quadoptions.mime_forward_rest,
            i18n::prompt_mime_forward_rest(),
        ) {
            Answer::Yes => {}
            Answer::No => attach_rest = false,
            Answer::Abort => return Ok(Assembled::Aborted),
        }
    }

    match focused {
        Some(i) => {
            let entry = &index.entries[i];
            if !attach_all && entry.part.decodable {
                let mut ctx = quoting.context(&mut body, config);
                render_part(entry, &mut ctx)?;
                ctx.write_raw("\n")?;
            } else {
                draft.parts.push(copy_body(entry)?);
            }
        }
        None => {
            if !attach_all {
                for (_, entry) in index.tagged().filter(|(_, e)| e.part.decodable) {
                    let mut ctx = quoting.context(&mut body, config);
                    render_part(entry, &mut ctx)?;
                    ctx.write_raw("\n")?;
                }
            }
            if attach_rest {
                copy_problematic_attachments(&mut draft, index, attach_all)?;
            }
        }
    }

    body.write_str(&forward_trailer(parent_env, compose))?;
    Ok(Assembled::Ready {
        draft,
        body: Some(body.finish()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{message_entry, Recorder, ScriptedUi};
    use crate::config::{Config, QuadOption};
    use crate::model::attachment::PartRange;
    use crate::model::mail::MessageSource;

    const M1: &str = "From: Alice <alice@example.com>\nMessage-ID: <m1@x>\nSubject: Lunch\n\nSee you at noon.\n";
    const M2: &str = "From: bob@example.com\nMessage-ID: <m2@x>\nSubject: Dinner\n\nAt eight.\n";

    fn config(tmp: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.general.tmp_dir = Some(tmp.to_path_buf());
        config
    }

    fn run_forward(
        config: &Config,
        ui: &mut ScriptedUi,
        rec: &mut Recorder,
        index: &AttachmentIndex,
        focused: Option<usize>,
    ) -> Result<()> {
        let mut mailbox = Recorder::default();
        let mut session = Session {
            config,
            ui,
            transport: rec,
            mailbox: &mut mailbox,
        };
        forward(&mut session, index, focused)
    }

    fn messages_index(tagged: bool) -> AttachmentIndex {
        let mut idx = crate::selection::tests::listing(&[]);
        idx.entries = vec![message_entry(M1, 0, tagged), message_entry(M2, 0, tagged)];
        idx
    }

    #[test]
    fn test_inline_message_forward() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        run_forward(&config, &mut ui, &mut rec, &messages_index(true), None).unwrap();

        let sent = &rec.sent[0];
        assert_eq!(sent.flags, SendFlags::FORWARD);
        assert_eq!(sent.draft.envelope.subject.as_deref(), Some("[alice@example.com: Lunch]"));
        assert!(sent.draft.parts.is_empty());
        assert_eq!(sent.reply_to.as_deref(), Some("<m1@x>"));
        let body = sent.body.as_deref().unwrap();
        assert!(body.starts_with("----- Forwarded message from Alice <alice@example.com> -----\n\n"));
        assert!(body.contains("See you at noon."));
        assert!(body.contains("At eight."));
        assert_eq!(body.matches("----- End forwarded message -----").count(), 2);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_mime_encapsulated_message_forward() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path());
        config.quadoptions.mime_forward = QuadOption::Yes;
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        run_forward(&config, &mut ui, &mut rec, &messages_index(false), Some(1)).unwrap();

        let sent = &rec.sent[0];
        assert!(sent.body.is_none());
        assert_eq!(sent.draft.parts.len(), 1);
        assert_eq!(sent.draft.parts[0].content_type, "message/rfc822");
        assert_eq!(sent.draft.parts[0].description.as_deref(), Some("Dinner"));
        assert_eq!(sent.draft.envelope.subject.as_deref(), Some("[bob@example.com: Dinner]"));
    }

    #[test]
    fn test_aborted_message_forward_sends_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path());
        config.quadoptions.mime_forward = QuadOption::AskNo;
        let mut ui = ScriptedUi::default();
        ui.answers.push_back(None);
        let mut rec = Recorder::default();
        run_forward(&config, &mut ui, &mut rec, &messages_index(true), None).unwrap();
        assert!(rec.sent.is_empty());
        assert_eq!(ui.messages, vec!["Message not forwarded.".to_string()]);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    /// A message at 0 holding a text part and an image, both tagged.
    fn body_index() -> AttachmentIndex {
        let raw = "From: Alice <alice@example.com>\nSubject: Photos\nMessage-ID: <p@x>\n\n\
                   Content-Type: text/plain\n\nLook at this.\n\
                   Content-Type: image/png\n\nPNGDATA\n";
        let mut parent = message_entry(raw, 0, false);
        let source = MessageSource::new("mem", raw.as_bytes().to_vec());

        let text_start = raw.find("Content-Type: text/plain").unwrap();
        let text_body = raw.find("Look").unwrap();
        let image_start = raw.find("Content-Type: image/png").unwrap();
        let image_body = raw.find("PNGDATA").unwrap();

        let mut text = crate::model::attachment::BodyPart::new("text", "plain");
        text.tagged = true;
        text.decodable = true;
        text.range = PartRange {
            header: text_start,
            body: text_body,
            end: image_start,
        };
        let mut image = crate::model::attachment::BodyPart::new("image", "png");
        image.tagged = true;
        image.encoding = "base64".to_string();
        image.range = PartRange {
            header: image_start,
            body: image_body,
            end: raw.len(),
        };
        parent.source = source.clone();

        let mut idx = crate::selection::tests::listing(&[]);
        idx.entries = vec![
            parent,
            crate::model::attachment::AttachmentEntry {
                part: text,
                level: 1,
                source: source.clone(),
            },
            crate::model::attachment::AttachmentEntry {
                part: image,
                level: 1,
                source,
            },
        ];
        idx
    }

    #[test]
    fn test_body_forward_with_parent_at_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        run_forward(&config, &mut ui, &mut rec, &body_index(), None).unwrap();

        let sent = &rec.sent[0];
        assert_eq!(sent.draft.envelope.subject.as_deref(), Some("[alice@example.com: Photos]"));
        assert_eq!(sent.reply_to.as_deref(), Some("<p@x>"));
        let body = sent.body.as_deref().unwrap();
        assert!(body.contains("Subject: Photos\n"));
        assert!(body.contains("Look at this.\n"));
        assert!(!body.contains("PNGDATA"));
        assert_eq!(sent.draft.parts.len(), 1);
        assert_eq!(sent.draft.parts[0].content_type, "image/png");
        assert_eq!(sent.draft.parts[0].data, b"PNGDATA\n");
    }

    #[test]
    fn test_body_forward_declining_rest_omits_attachments() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path());
        config.quadoptions.mime_forward_rest = QuadOption::AskYes;
        let mut ui = ScriptedUi::default();
        ui.answers.push_back(Some(false));
        let mut rec = Recorder::default();
        run_forward(&config, &mut ui, &mut rec, &body_index(), None).unwrap();
        assert!(ui.prompts[0].starts_with("Can't decode all tagged attachments."));
        assert!(rec.sent[0].draft.parts.is_empty());
    }

    #[test]
    fn test_undecodable_focused_part_is_attached_without_asking() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path());
        config.quadoptions.mime_forward = QuadOption::AskNo;
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        run_forward(&config, &mut ui, &mut rec, &body_index(), Some(2)).unwrap();
        assert!(ui.prompts.is_empty());
        assert_eq!(rec.sent[0].draft.parts[0].content_type, "image/png");
    }

    #[test]
    fn test_corrupt_part_discards_body() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let mut idx = body_index();
        idx.entries[2].part.range.end = 100_000;
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        let err = run_forward(&config, &mut ui, &mut rec, &idx, None).unwrap_err();
        assert!(matches!(err, SendError::PartOutOfRange { .. }));
        assert!(rec.sent.is_empty());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_nothing_selected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let mut idx = body_index();
        for entry in &mut idx.entries {
            entry.part.tagged = false;
        }
        let mut ui = ScriptedUi::default();
        let mut rec = Recorder::default();
        let err = run_forward(&config, &mut ui, &mut rec, &idx, None).unwrap_err();
        assert!(matches!(err, SendError::NothingSelected));
    }
}

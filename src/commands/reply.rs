//! Reply to embedded messages or to individual attachments.

use tracing::{debug, info, warn};

use super::forward::body_parent;
use super::{message_of, Session};
use crate::compose::envelope::{
    add_to_reference_headers, fetch_recips, fix_reply_recipients, make_misc_reply_headers,
    SendFlags,
};
use crate::compose::format::{attribution, post_indent, quote_prefix};
use crate::compose::pipeline::{copy_body, copy_problematic_attachments, include_header};
use crate::compose::render::{copy_message, render_part, CopyFlags};
use crate::compose::{Assembled, QuotingContext, TempBody};
use crate::config::{tmp_dir, Config};
use crate::error::{Result, SendError};
use crate::i18n;
use crate::model::attachment::AttachmentIndex;
use crate::model::mail::{Draft, Envelope, MessageHeader};
use crate::selection::{all_decodable, all_messages, count_tagged, Target};
use crate::ui::{query_quadoption, Answer};

/// Reply to the focused entry or the tagged entries.
///
/// `flags` picks the recipient scope: `REPLY`, `GROUP_REPLY` or
/// `LIST_REPLY`. When every part in scope is a message, each one is quoted
/// in full; otherwise the parts are quoted under their common parent.
pub fn reply(
    session: &mut Session<'_>,
    index: &AttachmentIndex,
    focused: Option<usize>,
    flags: SendFlags,
) -> Result<()> {
    let target = Target::resolve(index, focused)?;
    let focused = target.focused();

    let mut parent = None;
    if !all_messages(index, focused) {
        parent = Some(body_parent(index, target)?.ok_or(SendError::NoTaggedMessages)?);
    }

    // The message the reply is threaded under.
    let context = match (parent, focused) {
        (Some(p), _) => Some(p),
        (None, Some(i)) => Some(message_of(&index.entries[i])?),
        (None, None) => None,
    };

    match assemble(session, index, target, parent, context, flags)? {
        Assembled::Ready { draft, body } => {
            info!(?flags, to = draft.envelope.to.len(), parts = draft.parts.len(), "Sending reply");
            session.transport.send(flags, draft, body, context)?;
            if let Err(e) = mark_replied(session, index, target) {
                warn!(error = %e, "Could not flag message as replied");
            }
            Ok(())
        }
        Assembled::Aborted => {
            session.ui.message(i18n::msg_not_replied());
            Ok(())
        }
    }
}

/// Build the reply draft and its quoted body.
fn assemble(
    session: &mut Session<'_>,
    index: &AttachmentIndex,
    target: Target,
    parent: Option<&MessageHeader>,
    context: Option<&MessageHeader>,
    flags: SendFlags,
) -> Result<Assembled> {
    // Parts only count as attachments when replying to parts.
    let nattach = if parent.is_some() { count_tagged(index) } else { 0 };

    let mut attach_rest = nattach == 1;
    if nattach > 1 && !all_decodable(index, target.focused()) {
        match query_quadoption(
            session.ui,
            session.config.quadoptions.mime_forward_rest,
            i18n::prompt_mime_encapsulate_rest(),
        ) {
            Answer::Yes => attach_rest = true,
            Answer::No => {}
            Answer::Abort => return Ok(Assembled::Aborted),
        }
    }

    let mut draft = Draft::new();
    draft.envelope = reply_envelope(session, index, context, flags)?;

    let body = match parent {
        None => include_messages(session.config, index, target)?,
        Some(parent) => include_parts(session.config, index, target, parent, attach_rest, &mut draft)?,
    };
    Ok(Assembled::Ready {
        draft,
        body: Some(body.finish()?),
    })
}

/// Recipients, subject and threading headers of the reply.
///
/// With a `context` message they come from it alone; otherwise they are
/// merged from every tagged message.
fn reply_envelope(
    session: &mut Session<'_>,
    index: &AttachmentIndex,
    context: Option<&MessageHeader>,
    flags: SendFlags,
) -> Result<Envelope> {
    let config = session.config;
    let sources = match context {
        Some(message) => vec![message],
        None => index
            .tagged()
            .map(|(_, entry)| message_of(entry))
            .collect::<Result<Vec<&MessageHeader>>>()?,
    };
    let Some(first) = sources.first() else {
        return Err(SendError::NoTaggedMessages);
    };

    let mut env = Envelope::default();
    for source in &sources {
        fetch_recips(&mut env, &source.envelope, flags, config, session.ui)?;
    }
    if flags.contains(SendFlags::LIST_REPLY) && env.to.is_empty() {
        return Err(SendError::NoMailingLists);
    }

    fix_reply_recipients(&mut env, config);
    make_misc_reply_headers(&mut env, &first.envelope, config);
    for source in &sources {
        add_to_reference_headers(&mut env, &source.envelope);
    }
    debug!(to = env.to.len(), cc = env.cc.len(), "Built reply envelope");
    Ok(env)
}

/// Quote every message in scope in full, each with its own attribution.
fn include_messages(config: &Config, index: &AttachmentIndex, target: Target) -> Result<TempBody> {
    let mut body = TempBody::create(&tmp_dir(config))?;
    for (_, entry) in target.entries(index) {
        include_reply(config, message_of(entry)?, &mut body)?;
    }
    Ok(body)
}

fn include_reply(config: &Config, message: &MessageHeader, body: &mut TempBody) -> Result<()> {
    let compose = &config.compose;
    body.write_str(&attribution(&message.envelope, compose))?;

    let mut flags = CopyFlags::DECODE | CopyFlags::CHARCONV;
    if !compose.header {
        flags |= CopyFlags::NOHEADER;
    }
    if compose.weed {
        flags |= CopyFlags::WEED;
    }
    {
        let mut ctx = body
            .context(config)
            .with_flags(flags)
            .with_prefix(quote_prefix(None, &message.envelope, compose));
        copy_message(message, &mut ctx)?;
    }
    body.write_str(&post_indent(&message.envelope, compose))
}

/// Quote the parts in scope under the header of `parent`.
fn include_parts(
    config: &Config,
    index: &AttachmentIndex,
    target: Target,
    parent: &MessageHeader,
    attach_rest: bool,
    draft: &mut Draft,
) -> Result<TempBody> {
    let compose = &config.compose;
    let mut body = TempBody::create(&tmp_dir(config))?;
    body.write_str(&attribution(&parent.envelope, compose))?;

    let quoting = QuotingContext::new(config, &parent.envelope, true);
    if compose.header {
        include_header(true, parent, &mut body, quoting.prefix.as_deref(), config)?;
    }

    match target.focused() {
        Some(i) => {
            let entry = &index.entries[i];
            if entry.part.decodable {
                let mut ctx = quoting.context(&mut body, config);
                render_part(entry, &mut ctx)?;
                ctx.write_raw("\n")?;
            } else {
                draft.parts.push(copy_body(entry)?);
            }
        }
        None => {
            for (_, entry) in index.tagged().filter(|(_, e)| e.part.decodable) {
                let mut ctx = quoting.context(&mut body, config);
                render_part(entry, &mut ctx)?;
                ctx.write_raw("\n")?;
            }
        }
    }

    body.write_str(&post_indent(&parent.envelope, compose))?;

    if attach_rest && target.focused().is_none() {
        copy_problematic_attachments(draft, index, false)?;
    }
    Ok(body)
}

/// Flag the enclosing message as answered, or each message in scope when
/// the listing has no enclosing message.
fn mark_replied(session: &mut Session<'_>, index: &AttachmentIndex, target: Target) -> Result<()> {
    let marked: Vec<&MessageHeader> = match &index.root_header {
        Some(root) => vec![root],
        None => target
            .entries(index)
            .into_iter()
            .filter_map(|(_, entry)| entry.part.message.as_ref())
            .collect(),
    };
    for message in marked {
        session.mailbox.set_replied(message)?;
    }
    Ok(())
}

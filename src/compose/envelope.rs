//! Recipient and header computation for replies and forwards.

use bitflags::bitflags;
use tracing::debug;

use super::format::expand;
use crate::config::Config;
use crate::error::{Result, SendError};
use crate::i18n;
use crate::model::address::{dedup_addresses, format_list, EmailAddress};
use crate::model::mail::Envelope;
use crate::ui::{query_quadoption, Answer, Ui};

bitflags! {
    /// Kind of outgoing message, passed on to the send pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SendFlags: u32 {
        const REPLY = 1 << 0;
        const GROUP_REPLY = 1 << 1;
        const LIST_REPLY = 1 << 2;
        const TO_SENDER = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

/// Is `addr` one of the user's own addresses?
pub fn is_user(addr: &EmailAddress, config: &Config) -> bool {
    config
        .identity
        .from
        .as_deref()
        .map(EmailAddress::parse)
        .is_some_and(|me| addr.same_mailbox(&me.address))
        || config
            .identity
            .alternates
            .iter()
            .any(|alt| addr.same_mailbox(alt))
}

/// Is `addr` a known mailing list?
pub fn is_list(addr: &EmailAddress, config: &Config) -> bool {
    config.lists.iter().any(|list| addr.same_mailbox(list))
}

/// Add the recipients for replying to `source` into `out`.
///
/// - `LIST_REPLY`: the known mailing lists among To and Cc.
/// - `TO_SENDER`: the From addresses.
/// - otherwise: the default reply address, plus To and Cc as Cc for a
///   group reply (Mail-Followup-To replaces all of them when present).
///
/// Declining the Reply-To question falls back to From; aborting it is
/// [`SendError::Cancelled`].
pub fn fetch_recips(
    out: &mut Envelope,
    source: &Envelope,
    flags: SendFlags,
    config: &Config,
    ui: &mut dyn Ui,
) -> Result<()> {
    if flags.contains(SendFlags::LIST_REPLY) {
        out.to.extend(
            source
                .to
                .iter()
                .chain(&source.cc)
                .filter(|a| is_list(a, config))
                .cloned(),
        );
        if !source.mail_followup_to.is_empty() {
            out.cc.extend(source.mail_followup_to.iter().cloned());
        }
    } else if flags.contains(SendFlags::TO_SENDER) {
        out.to.extend(source.from.iter().cloned());
    } else {
        let group = flags.contains(SendFlags::GROUP_REPLY);
        default_to(&mut out.to, source, group, config, ui)?;
        if group && source.mail_followup_to.is_empty() {
            out.cc.extend(source.to.iter().cloned());
            out.cc.extend(source.cc.iter().cloned());
        }
    }
    debug!(?flags, to = out.to.len(), cc = out.cc.len(), "Fetched reply recipients");
    Ok(())
}

fn default_to(
    to: &mut Vec<EmailAddress>,
    source: &Envelope,
    group: bool,
    config: &Config,
    ui: &mut dyn Ui,
) -> Result<()> {
    if group && !source.mail_followup_to.is_empty() {
        to.extend(source.mail_followup_to.iter().cloned());
        return Ok(());
    }

    // Replying to one's own message goes to its original recipients.
    if !group && source.from.iter().any(|a| is_user(a, config)) {
        to.extend(source.to.iter().cloned());
        return Ok(());
    }

    let reply_to_is_from = source.reply_to.len() == 1
        && source
            .from
            .first()
            .is_some_and(|f| source.reply_to[0].same_mailbox(&f.address));

    if source.reply_to.is_empty() {
        to.extend(source.from.iter().cloned());
    } else if reply_to_is_from {
        to.extend(source.reply_to.iter().cloned());
    } else {
        let prompt = i18n::prompt_reply_to(&format_list(&source.reply_to));
        match query_quadoption(ui, config.quadoptions.reply_to, &prompt) {
            Answer::Yes => to.extend(source.reply_to.iter().cloned()),
            Answer::No => to.extend(source.from.iter().cloned()),
            Answer::Abort => return Err(SendError::Cancelled),
        }
    }
    Ok(())
}

/// Tidy the recipients of a reply: drop the user's own addresses and
/// duplicates, drop Cc entries already in To, and promote Cc to To when To
/// ends up empty.
pub fn fix_reply_recipients(env: &mut Envelope, config: &Config) {
    remove_user(&mut env.to, env.cc.is_empty(), config);
    remove_user(&mut env.cc, env.to.is_empty(), config);

    dedup_addresses(&mut env.to);
    dedup_addresses(&mut env.cc);
    let to = env.to.clone();
    env.cc
        .retain(|c| !to.iter().any(|t| t.same_mailbox(&c.address)));

    if env.to.is_empty() && !env.cc.is_empty() {
        env.to = std::mem::take(&mut env.cc);
    }
}

/// Remove the user's addresses; with `leave_only`, keep the last one when
/// it would otherwise leave the list empty.
fn remove_user(list: &mut Vec<EmailAddress>, leave_only: bool, config: &Config) {
    let before = list.clone();
    list.retain(|a| !is_user(a, config));
    if list.is_empty() && leave_only {
        if let Some(last) = before.into_iter().last() {
            list.push(last);
        }
    }
}

/// Subject of a forward, from the configured forward format.
pub fn make_forward_subject(out: &mut Envelope, source: &Envelope, config: &Config) {
    out.subject = Some(expand(&config.compose.forward_format, source, &config.compose));
}

/// Subject of a reply: a single `Re: ` prefix, or the configured
/// placeholder when the original has none.
pub fn make_misc_reply_headers(out: &mut Envelope, source: &Envelope, config: &Config) {
    out.subject = Some(match source.subject.as_deref().map(str::trim) {
        None | Some("") => config.compose.empty_subject.clone(),
        Some(subject) if has_reply_prefix(subject) => subject.to_string(),
        Some(subject) => format!("Re: {subject}"),
    });
}

/// `Re:`, `RE:` or `Re[2]:` at the start of a subject.
fn has_reply_prefix(subject: &str) -> bool {
    let Some(rest) = subject
        .get(..2)
        .filter(|p| p.eq_ignore_ascii_case("re"))
        .map(|_| &subject[2..])
    else {
        return false;
    };
    let rest = match rest.strip_prefix('[') {
        Some(counted) => match counted.find(']') {
            Some(end) if counted[..end].chars().all(|c| c.is_ascii_digit()) => &counted[end + 1..],
            _ => return false,
        },
        None => rest,
    };
    rest.starts_with(':')
}

/// Thread the reply under `source`: append its references (or, lacking
/// them, its In-Reply-To) and its Message-ID to References, and its
/// Message-ID to In-Reply-To. Duplicates are skipped, so several sources
/// can be merged into one draft.
pub fn add_to_reference_headers(out: &mut Envelope, source: &Envelope) {
    let chain = if source.references.is_empty() {
        &source.in_reply_to
    } else {
        &source.references
    };
    for id in chain.iter().chain(source.message_id.as_ref()) {
        if !out.references.contains(id) {
            out.references.push(id.clone());
        }
    }
    if let Some(id) = &source.message_id {
        if !out.in_reply_to.contains(id) {
            out.in_reply_to.push(id.clone());
        }
    }
}

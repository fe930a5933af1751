//! The send pipeline: collaborator traits and an outbox-directory
//! implementation that writes every outgoing message as an `.eml` file.

pub mod eml;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use chrono::Utc;
use tempfile::TempPath;
use tracing::{debug, info};

use crate::compose::envelope::SendFlags;
use crate::config::Config;
use crate::error::{Result, SendError};
use crate::model::address::EmailAddress;
use crate::model::mail::{Draft, MessageHeader};
use eml::Stamp;

/// Takes finished drafts and original messages and delivers them.
pub trait Transport {
    /// Send a composed draft. `body` is the text body file, consumed (and
    /// deleted) by the transport; `reply_to` is the message being answered
    /// or forwarded.
    fn send(
        &mut self,
        flags: SendFlags,
        draft: Draft,
        body: Option<TempPath>,
        reply_to: Option<&MessageHeader>,
    ) -> Result<()>;

    /// Redirect `message` unchanged to `to`.
    fn bounce(&mut self, message: &MessageHeader, to: &[EmailAddress]) -> Result<()>;

    /// Reopen `message` as a new draft.
    fn resend(&mut self, message: &MessageHeader) -> Result<()>;
}

/// Where message flags are kept.
pub trait Mailbox {
    fn set_replied(&mut self, message: &MessageHeader) -> Result<()>;
}

/// Name of the file that records answered messages.
const REPLIED_LOG: &str = "replied.log";

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Writes outgoing messages into a directory.
#[derive(Debug, Clone)]
pub struct Outbox {
    dir: PathBuf,
    from: Vec<EmailAddress>,
    headers: crate::config::HeaderConfig,
}

impl Outbox {
    pub fn new(dir: PathBuf, config: &Config) -> Self {
        let from = config
            .identity
            .from
            .as_deref()
            .map(EmailAddress::parse_list)
            .unwrap_or_default();
        Self {
            dir,
            from,
            headers: config.headers.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stamp(&self) -> Stamp {
        let date = Utc::now();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let domain = self
            .from
            .first()
            .and_then(EmailAddress::domain)
            .unwrap_or("localhost")
            .to_string();
        Stamp {
            token: format!("{}.{}.{seq}", date.format("%Y%m%d%H%M%S%6f"), std::process::id()),
            date,
            domain,
        }
    }

    fn write(&self, stamp: &Stamp, kind: &str, subject: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("cannot create outbox {}", self.dir.display()))?;
        let path = eml::unique_path(&self.dir.join(eml::eml_filename(&stamp.date, kind, subject)));
        std::fs::write(&path, bytes).with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), kind, "Wrote outgoing message");
        Ok(path)
    }

    /// Write a draft; returns the created file.
    pub fn write_draft(
        &self,
        flags: SendFlags,
        draft: &Draft,
        body: Option<&Path>,
    ) -> anyhow::Result<PathBuf> {
        let text = match body {
            Some(path) => {
                let raw = std::fs::read(path)
                    .with_context(|| format!("cannot read draft body {}", path.display()))?;
                String::from_utf8_lossy(&raw).into_owned()
            }
            None => String::new(),
        };
        let stamp = self.stamp();
        let bytes = eml::render_draft(draft, &self.from, &text, &stamp);
        let subject = draft.envelope.subject.as_deref().unwrap_or("");
        self.write(&stamp, kind_of(flags), subject, &bytes)
    }

    /// Write a bounce of `message` to `to`; returns the created file.
    pub fn write_bounce(&self, message: &MessageHeader, to: &[EmailAddress]) -> anyhow::Result<PathBuf> {
        let stamp = self.stamp();
        let bytes = eml::render_bounce(message, &self.from, to, &stamp, &self.headers)?;
        let subject = message.envelope.subject.as_deref().unwrap_or("");
        self.write(&stamp, "bounce", subject, &bytes)
    }

    /// Write a resend template of `message`; returns the created file.
    pub fn write_resend(&self, message: &MessageHeader) -> anyhow::Result<PathBuf> {
        let stamp = self.stamp();
        let bytes = eml::render_resend(message, &self.headers)?;
        let subject = message.envelope.subject.as_deref().unwrap_or("");
        self.write(&stamp, "resend", subject, &bytes)
    }

    /// Append a line for `message` to the replied log.
    pub fn record_replied(&self, message: &MessageHeader) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(REPLIED_LOG);
        let mut log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let id = message
            .envelope
            .message_id
            .as_deref()
            .unwrap_or(message.source.name.as_str());
        writeln!(log, "{}\t{id}", Utc::now().to_rfc3339())?;
        debug!(message_id = id, "Marked message replied");
        Ok(())
    }
}

fn kind_of(flags: SendFlags) -> &'static str {
    if flags.contains(SendFlags::FORWARD) {
        "forward"
    } else if flags.intersects(SendFlags::REPLY | SendFlags::GROUP_REPLY | SendFlags::LIST_REPLY) {
        "reply"
    } else {
        "compose"
    }
}

fn send_error(e: anyhow::Error) -> SendError {
    SendError::Send(format!("{e:#}"))
}

impl Transport for Outbox {
    fn send(
        &mut self,
        flags: SendFlags,
        draft: Draft,
        body: Option<TempPath>,
        reply_to: Option<&MessageHeader>,
    ) -> Result<()> {
        debug!(
            ?flags,
            parts = draft.parts.len(),
            in_reply_to = reply_to.and_then(|m| m.envelope.message_id.as_deref()),
            "Sending draft"
        );
        // The body file is removed when `body` goes out of scope.
        self.write_draft(flags, &draft, body.as_deref())
            .map(|_| ())
            .map_err(send_error)
    }

    fn bounce(&mut self, message: &MessageHeader, to: &[EmailAddress]) -> Result<()> {
        self.write_bounce(message, to).map(|_| ()).map_err(send_error)
    }

    fn resend(&mut self, message: &MessageHeader) -> Result<()> {
        self.write_resend(message).map(|_| ()).map_err(send_error)
    }
}

impl Mailbox for Outbox {
    fn set_replied(&mut self, message: &MessageHeader) -> Result<()> {
        self.record_replied(message).map_err(send_error)
    }
}

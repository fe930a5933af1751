//! Draft assembly: templates, envelopes, body rendering and the steps
//! shared by forward and reply.

pub mod envelope;
pub mod format;
pub mod pipeline;
pub mod render;

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SendError};
use crate::model::mail::{Draft, Envelope};
use render::{CopyFlags, RenderContext};

/// Outcome of building a draft.
#[derive(Debug)]
pub enum Assembled {
    /// Ready to hand to the send pipeline, which then owns both.
    Ready { draft: Draft, body: Option<TempPath> },
    /// The user declined; nothing to send.
    Aborted,
}

/// Quote prefix and copy flags for the body parts of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotingContext {
    /// `None` when parts are copied without quoting.
    pub prefix: Option<String>,
    /// Convert text to UTF-8.
    pub charconv: bool,
    /// Weed headers of embedded messages.
    pub weed: bool,
}

impl QuotingContext {
    /// Settings for copying parts of `parent`, quoted when `quote` is set.
    pub fn new(config: &Config, parent: &Envelope, quote: bool) -> Self {
        Self {
            prefix: quote.then(|| format::quote_prefix(None, parent, &config.compose)),
            charconv: true,
            weed: config.compose.weed,
        }
    }

    /// A render context writing to `body` with these settings.
    pub fn context<'a>(&self, body: &'a mut TempBody, config: &'a Config) -> RenderContext<'a> {
        let mut flags = CopyFlags::empty();
        if self.charconv {
            flags |= CopyFlags::CHARCONV;
        }
        if self.weed {
            flags |= CopyFlags::WEED;
        }
        let ctx = body.context(config).with_flags(flags);
        match &self.prefix {
            Some(prefix) => ctx.with_prefix(prefix.clone()),
            None => ctx,
        }
    }
}

/// Temporary file holding the text body of a draft.
///
/// The file is deleted when this value (or the [`TempPath`] returned by
/// [`TempBody::finish`]) is dropped, so every early return cleans up.
#[derive(Debug)]
pub struct TempBody {
    file: NamedTempFile,
    path: PathBuf,
}

impl TempBody {
    /// Create an empty body file in `dir`.
    pub fn create(dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("mboxsend-")
            .suffix(".txt")
            .tempfile_in(dir)
            .map_err(|source| SendError::TempFile {
                path: dir.to_path_buf(),
                source,
            })?;
        let path = file.path().to_path_buf();
        debug!(path = %path.display(), "Created draft body");
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A plain render context on this file.
    pub fn context<'a>(&'a mut self, config: &'a Config) -> RenderContext<'a> {
        RenderContext::new(&mut self.file, &self.path, config)
    }

    /// Write text as is.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.file
            .write_all(text.as_bytes())
            .map_err(|e| SendError::io(&self.path, e))
    }

    /// Flush and close the file, keeping it on disk until the returned
    /// path is dropped.
    pub fn finish(mut self) -> Result<TempPath> {
        self.file
            .flush()
            .map_err(|e| SendError::io(&self.path, e))?;
        Ok(self.file.into_temp_path())
    }
}

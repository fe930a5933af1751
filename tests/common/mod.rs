//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mboxsend::config::{Config, DecodeConfig};
use mboxsend::model::attachment::AttachmentIndex;
use mboxsend::model::mail::MessageSource;
use mboxsend::parser::mime;
use mboxsend::ui::Ui;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn source(name: &str) -> Arc<MessageSource> {
    MessageSource::open(&fixture(name)).unwrap()
}

/// Listing of one fixture message.
pub fn index_of(name: &str) -> AttachmentIndex {
    mime::build_index(source(name), &DecodeConfig::default()).unwrap()
}

/// Listing of several fixture messages side by side.
pub fn virtual_index_of(names: &[&str]) -> AttachmentIndex {
    let sources: Vec<_> = names.iter().map(|n| source(n)).collect();
    mime::build_virtual_index(&sources, &DecodeConfig::default()).unwrap()
}

/// A config that keeps temporary bodies in `tmp` and signs as `me@example.org`.
pub fn config(tmp: &Path) -> Config {
    let mut config = Config::default();
    config.general.tmp_dir = Some(tmp.to_path_buf());
    config.identity.from = Some("Me <me@example.org>".to_string());
    config
}

/// Sorted names of the files in `dir`.
pub fn files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Answers prompts from a script and records what was shown.
#[derive(Default)]
pub struct ScriptedUi {
    pub fields: VecDeque<Option<String>>,
    pub answers: VecDeque<Option<bool>>,
    pub prompts: Vec<String>,
    pub messages: Vec<String>,
    pub errors: Vec<String>,
}

impl ScriptedUi {
    pub fn with_field(line: &str) -> Self {
        let mut ui = Self::default();
        ui.fields.push_back(Some(line.to_string()));
        ui
    }
}

impl Ui for ScriptedUi {
    fn get_field(&mut self, prompt: &str) -> Option<String> {
        self.prompts.push(prompt.to_string());
        self.fields.pop_front().flatten()
    }

    fn yes_or_no(&mut self, prompt: &str, default: bool) -> Option<bool> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().unwrap_or(Some(default))
    }

    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn error(&mut self, text: &str) {
        self.errors.push(text.to_string());
    }

    fn pause(&mut self) {}

    fn columns(&self) -> usize {
        80
    }
}

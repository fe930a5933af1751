//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXSEND_CONFIG` (environment variable)
//! 2. `~/.config/mboxsend/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxsend\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! A loaded [`Config`] is an immutable snapshot: commands receive it by
//! reference and never read settings from anywhere else.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Quoting, attribution and forwarding templates.
    pub compose: ComposeConfig,
    /// Answers for the yes/no/ask confirmations.
    pub quadoptions: QuadOptions,
    /// Header weeding and ordering.
    pub headers: HeaderConfig,
    /// Who "me" is when computing reply recipients.
    pub identity: IdentityConfig,
    /// Addresses of known mailing lists.
    pub lists: Vec<String>,
    /// Alias name → address line.
    pub aliases: BTreeMap<String, String>,
    /// Which attachments count as displayable text.
    pub decode: DecodeConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Where outgoing drafts, bounces and resends are written.
    pub outbox_dir: Option<PathBuf>,
    /// Where temporary draft bodies are created (system temp dir if unset).
    pub tmp_dir: Option<PathBuf>,
}

/// Quoting, attribution and forwarding templates.
///
/// Templates accept `%a` (sender address), `%n` (sender name), `%f` (full
/// From), `%s` (subject), `%d` (date), `%i` (Message-ID) and `%%`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Prefix for quoted lines.
    pub indent_string: String,
    /// Flowed text mode: quote with a bare `>` instead of `indent_string`.
    pub text_flowed: bool,
    /// Weed and reorder headers when quoting or forwarding.
    pub weed: bool,
    /// Include the quoted message header in replies.
    pub header: bool,
    /// Quote forwarded content.
    pub forward_quote: bool,
    /// Decode forwarded messages when not MIME-encapsulating.
    pub forward_decode: bool,
    /// Line written before quoted reply content.
    pub attribution: String,
    /// Line written after quoted reply content (empty disables it).
    pub post_indent_string: String,
    /// Line written before forwarded content.
    pub forward_intro: String,
    /// Line written after forwarded content.
    pub forward_trailer: String,
    /// Subject of a forwarded message.
    pub forward_format: String,
    /// `strftime` format for `%d`.
    pub date_format: String,
    /// Subject used in replies to messages without one.
    pub empty_subject: String,
}

/// The four-state answer policy of a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuadOption {
    /// Answer yes without asking.
    Yes,
    /// Answer no without asking.
    No,
    /// Ask, defaulting to yes.
    AskYes,
    /// Ask, defaulting to no.
    AskNo,
}

/// Policies for the confirmations the commands can raise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadOptions {
    /// Confirm a bounce.
    pub bounce: QuadOption,
    /// Forward as MIME attachments instead of inline text.
    pub mime_forward: QuadOption,
    /// MIME-attach the parts that cannot be decoded.
    pub mime_forward_rest: QuadOption,
    /// Honor a Reply-To header that differs from From.
    pub reply_to: QuadOption,
}

/// Header weeding and ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Header name prefixes hidden when weeding (`*` hides everything).
    pub ignore: Vec<String>,
    /// Header name prefixes shown despite `ignore`.
    pub unignore: Vec<String>,
    /// Display order of headers when weeding.
    pub order: Vec<String>,
}

/// The user's own addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Address used in `From:` of outgoing drafts.
    pub from: Option<String>,
    /// Other addresses that are also "me".
    pub alternates: Vec<String>,
}

/// Decodability policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Extra MIME types (`type/subtype` or `type/*`) treated as text.
    pub autoview: Vec<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
            outbox_dir: None,
            tmp_dir: None,
        }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            indent_string: "> ".to_string(),
            text_flowed: false,
            weed: true,
            header: false,
            forward_quote: false,
            forward_decode: true,
            attribution: "On %d, %n wrote:".to_string(),
            post_indent_string: String::new(),
            forward_intro: "----- Forwarded message from %f -----".to_string(),
            forward_trailer: "----- End forwarded message -----".to_string(),
            forward_format: "[%a: %s]".to_string(),
            date_format: "%a, %d %b %Y %H:%M:%S %z".to_string(),
            empty_subject: "Re: your mail".to_string(),
        }
    }
}

impl Default for QuadOptions {
    fn default() -> Self {
        Self {
            bounce: QuadOption::AskYes,
            mime_forward: QuadOption::No,
            mime_forward_rest: QuadOption::Yes,
            reply_to: QuadOption::AskYes,
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            ignore: vec!["*".to_string()],
            unignore: [
                "from",
                "subject",
                "to",
                "cc",
                "date",
                "reply-to",
                "mail-followup-to",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            order: ["date", "from", "to", "cc", "subject"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MBOXSEND_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mboxsend").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxsend")
}

/// Return the directory outgoing messages are written to.
pub fn outbox_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.outbox_dir {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxsend")
        .join("outbox")
}

/// Return the directory temporary draft bodies are created in.
pub fn tmp_dir(config: &Config) -> PathBuf {
    config
        .general
        .tmp_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.compose.indent_string, "> ");
        assert!(cfg.compose.weed);
        assert_eq!(cfg.quadoptions.bounce, QuadOption::AskYes);
        assert_eq!(cfg.quadoptions.mime_forward, QuadOption::No);
        assert_eq!(cfg.headers.ignore, vec!["*".to_string()]);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.aliases
            .insert("team".to_string(), "a@example.com, b@example.com".to_string());
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.compose.attribution, cfg.compose.attribution);
        assert_eq!(parsed.quadoptions.reply_to, cfg.quadoptions.reply_to);
        assert_eq!(parsed.aliases.get("team"), cfg.aliases.get("team"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
lists = ["dev@lists.example.org"]

[compose]
text_flowed = true

[quadoptions]
mime_forward = "ask-no"
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert!(cfg.compose.text_flowed);
        assert_eq!(cfg.quadoptions.mime_forward, QuadOption::AskNo);
        assert_eq!(cfg.lists, vec!["dev@lists.example.org".to_string()]);
        // Other fields use defaults
        assert_eq!(cfg.quadoptions.bounce, QuadOption::AskYes);
        assert_eq!(cfg.compose.indent_string, "> ");
    }

    #[test]
    fn test_tmp_dir_override() {
        let mut cfg = Config::default();
        cfg.general.tmp_dir = Some(PathBuf::from("/var/tmp/drafts"));
        assert_eq!(tmp_dir(&cfg), PathBuf::from("/var/tmp/drafts"));
    }
}

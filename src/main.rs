//! CLI entry point for `mboxsend`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};

use mboxsend::commands::{self, Action, Session};
use mboxsend::compose::envelope::SendFlags;
use mboxsend::config::Config;
use mboxsend::error::SendError;
use mboxsend::i18n;
use mboxsend::model::attachment::AttachmentIndex;
use mboxsend::model::mail::MessageSource;
use mboxsend::outbox::Outbox;
use mboxsend::parser::mime;
use mboxsend::ui::prompt::LinePrompt;

#[derive(Parser)]
#[command(name = "mboxsend", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Language (en, es). Defaults to system locale.
    #[arg(long, value_name = "LANG", global = true)]
    lang: Option<String>,

    /// Directory outgoing messages are written to
    #[arg(long, value_name = "DIR", global = true, env = "MBOXSEND_OUTBOX")]
    outbox: Option<PathBuf>,
}

/// Input messages and the parts to act on.
#[derive(Args)]
struct Selection {
    /// Message files (.eml); several files are listed as one set of messages
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Act on attachment N only
    #[arg(short, long, value_name = "N")]
    part: Option<usize>,

    /// Tag attachment N (repeatable)
    #[arg(short, long = "tag", value_name = "N")]
    tags: Vec<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the attachment listing
    List {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Bounce messages
    Bounce(Selection),
    /// Resend messages
    Resend(Selection),
    /// Forward parts
    Forward(Selection),
    /// Reply to parts
    Reply(Selection),
    /// Reply to all recipients
    GroupReply(Selection),
    /// Reply to mailing lists
    ListReply(Selection),
    /// Compose to the senders
    ComposeToSender(Selection),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

/// Detect language early from --lang arg or system env, before clap processes --help.
fn detect_lang_early() -> i18n::Lang {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--lang" {
            if let Some(code) = args.get(i + 1) {
                if let Some(lang) = i18n::Lang::from_code(code) {
                    return lang;
                }
            }
        }
        if let Some(code) = args[i].strip_prefix("--lang=") {
            if let Some(lang) = i18n::Lang::from_code(code) {
                return lang;
            }
        }
    }
    i18n::detect_system_lang()
}

/// Build a localized clap Command using i18n strings.
fn build_localized_command() -> clap::Command {
    let mut cmd = Cli::command()
        .about(i18n::app_about())
        .after_help(i18n::app_after_help());

    let subcommands: Vec<clap::Command> = cmd
        .get_subcommands()
        .map(|sub| {
            let about = match sub.get_name() {
                "list" => Some(i18n::help_cmd_list()),
                "bounce" => Some(i18n::help_cmd_bounce()),
                "resend" => Some(i18n::help_cmd_resend()),
                "forward" => Some(i18n::help_cmd_forward()),
                "reply" => Some(i18n::help_cmd_reply()),
                "group-reply" => Some(i18n::help_cmd_group_reply()),
                "list-reply" => Some(i18n::help_cmd_list_reply()),
                "compose-to-sender" => Some(i18n::help_cmd_compose_to_sender()),
                "completions" => Some(i18n::help_cmd_completions()),
                "manpage" => Some(i18n::help_cmd_manpage()),
                _ => None,
            };
            match about {
                Some(about) => sub.clone().about(about),
                None => sub.clone(),
            }
        })
        .collect();

    for sub in subcommands {
        cmd = cmd.mut_subcommand(sub.get_name(), |_| sub.clone());
    }
    cmd
}

fn main() -> anyhow::Result<()> {
    // Detect language BEFORE clap parsing so --help is localized
    i18n::set_lang(detect_lang_early());

    let matches = build_localized_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let mut config = mboxsend::config::load_config();
    if let Some(dir) = cli.outbox {
        config.general.outbox_dir = Some(dir);
    }

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::List { files, json } => cmd_list(&files, json, &config),
        Commands::Bounce(sel) => cmd_action(&sel, Action::Bounce, &config),
        Commands::Resend(sel) => cmd_action(&sel, Action::Resend, &config),
        Commands::Forward(sel) => cmd_action(&sel, Action::Forward, &config),
        Commands::Reply(sel) => cmd_action(&sel, Action::Reply(SendFlags::REPLY), &config),
        Commands::GroupReply(sel) => {
            cmd_action(&sel, Action::Reply(SendFlags::GROUP_REPLY), &config)
        }
        Commands::ListReply(sel) => {
            cmd_action(&sel, Action::Reply(SendFlags::LIST_REPLY), &config)
        }
        Commands::ComposeToSender(sel) => cmd_action(&sel, Action::MailSender, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mboxsend::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxsend.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Read the input files into one attachment listing.
///
/// One file is listed as a message with its parts; several files become a
/// listing of messages without an enclosing one.
fn load_index(files: &[PathBuf], config: &Config) -> anyhow::Result<AttachmentIndex> {
    for path in files {
        if !path.exists() {
            anyhow::bail!("{}: {}", i18n::err_file_not_found(), path.display());
        }
    }
    let sources = files
        .iter()
        .map(|path| MessageSource::open(path))
        .collect::<Result<Vec<Arc<MessageSource>>, SendError>>()?;

    let index = match sources.as_slice() {
        [single] => mime::build_index(single.clone(), &config.decode)?,
        _ => mime::build_virtual_index(&sources, &config.decode)?,
    };
    tracing::debug!(files = files.len(), entries = index.len(), "Loaded attachment listing");
    Ok(index)
}

/// Print the attachment listing as an indented tree or as JSON.
fn cmd_list(files: &[PathBuf], json: bool, config: &Config) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let index = load_index(files, config)?;
    if json {
        let rows: Vec<serde_json::Value> = index
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let part = &entry.part;
                serde_json::json!({
                    "index": i,
                    "level": entry.level,
                    "content_type": part.content_type(),
                    "filename": part.filename,
                    "description": part.description,
                    "encoding": part.encoding,
                    "size": part.body_len(),
                    "decodable": part.decodable,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if index.is_empty() {
        println!("{}", i18n::msg_no_attachments());
        return Ok(());
    }
    for (i, entry) in index.entries.iter().enumerate() {
        let part = &entry.part;
        let label = part
            .filename
            .as_deref()
            .or(part.description.as_deref())
            .unwrap_or("");
        println!(
            "{i:>3}  {:indent$}{:<24} {:>10}  {label}",
            "",
            part.content_type(),
            format_size(part.body_len(), BINARY),
            indent = entry.level * 2,
        );
    }
    Ok(())
}

/// Run one command on the selected parts, prompting on the terminal and
/// writing the result into the outbox.
fn cmd_action(selection: &Selection, action: Action, config: &Config) -> anyhow::Result<()> {
    let mut index = load_index(&selection.files, config)?;
    for &n in &selection.tags {
        if n >= index.len() {
            return Err(SendError::NoSuchPart(n).into());
        }
        index.set_tagged(n, true);
    }

    let outbox_dir = mboxsend::config::outbox_dir(config);
    let mut transport = Outbox::new(outbox_dir, config);
    let mut mailbox = transport.clone();
    let stdin = std::io::stdin();
    let mut ui = LinePrompt::new(stdin.lock(), std::io::stderr());

    let mut session = Session {
        config,
        ui: &mut ui,
        transport: &mut transport,
        mailbox: &mut mailbox,
    };
    if !commands::run(&mut session, action, &index, selection.part) {
        std::process::exit(1);
    }
    tracing::info!(outbox = %transport.dir().display(), "Done");
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxsend", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

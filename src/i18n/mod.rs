//! Internationalization (i18n) module.
//!
//! Provides localized strings for prompts, status messages and CLI output.
//! English is the default language; Spanish is available as an alternative.

use std::path::Path;
use std::sync::OnceLock;

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English (default)
    En,
    /// Spanish
    Es,
}

impl Lang {
    /// Parse a language code string (e.g. "en", "es", "en_US", "es_ES").
    /// Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-', '.']).next().unwrap_or("");
        match prefix {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            _ => None,
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }
}

/// Initialize the global language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the currently configured language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// Detect language from `MBOXSEND_LANG`, `LC_MESSAGES` or `LANG`.
pub fn detect_system_lang() -> Lang {
    std::env::var("MBOXSEND_LANG")
        .ok()
        .and_then(|v| Lang::from_code(&v))
        .or_else(|| {
            std::env::var("LC_MESSAGES")
                .ok()
                .and_then(|v| Lang::from_code(&v))
        })
        .or_else(|| std::env::var("LANG").ok().and_then(|v| Lang::from_code(&v)))
        .unwrap_or(Lang::En)
}

/// Macro for defining translatable message functions.
/// Each function returns a `&'static str` based on the current language.
macro_rules! msg {
    ($name:ident, $en:expr, $es:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Es => $es,
            }
        }
    };
}

/// Like `msg!`, but picks between a singular and a plural phrasing.
macro_rules! msg_n {
    ($name:ident, [$en1:expr, $en2:expr], [$es1:expr, $es2:expr]) => {
        /// Returns a localized singular or plural string.
        pub fn $name(single: bool) -> &'static str {
            match (lang(), single) {
                (Lang::En, true) => $en1,
                (Lang::En, false) => $en2,
                (Lang::Es, true) => $es1,
                (Lang::Es, false) => $es2,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(app_name, "mboxsend", "mboxsend");
msg!(
    app_about,
    "mboxsend \u{2014} bounce, resend, forward and reply to parts of a message picked from its attachment listing.",
    "mboxsend \u{2014} rebota, reenv\u{ed}a y responde a partes de un mensaje elegidas en su lista de adjuntos."
);
msg!(
    app_after_help,
    "Select a part with --part N or tag several with --tag N (repeatable).\nRun 'list' first to see the attachment numbers.",
    "Elige una parte con --part N o marca varias con --tag N (repetible).\nEjecuta 'list' primero para ver los n\u{fa}meros de adjunto."
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_cmd_list,
    "Show the attachment listing of one or more messages",
    "Mostrar la lista de adjuntos de uno o m\u{e1}s mensajes"
);
msg!(
    help_cmd_bounce,
    "Bounce the selected message parts",
    "Rebotar los mensajes seleccionados"
);
msg!(
    help_cmd_resend,
    "Resend the selected message parts",
    "Reenviar como nuevos los mensajes seleccionados"
);
msg!(
    help_cmd_forward,
    "Forward the selected parts",
    "Reenviar las partes seleccionadas"
);
msg!(
    help_cmd_reply,
    "Reply to the selected parts",
    "Responder a las partes seleccionadas"
);
msg!(
    help_cmd_group_reply,
    "Reply to all recipients of the selected parts",
    "Responder a todos los destinatarios"
);
msg!(
    help_cmd_list_reply,
    "Reply to the mailing lists of the selected parts",
    "Responder a las listas de correo"
);
msg!(
    help_cmd_compose_to_sender,
    "Compose a new message to the senders of the selected messages",
    "Redactar un mensaje nuevo a los remitentes"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "Generar completions para tu shell"
);
msg!(
    help_cmd_manpage,
    "Generate a man page",
    "Generar p\u{e1}gina de manual"
);

// ── Listing output ───────────────────────────────────────────────

msg!(msg_no_attachments, "No attachments", "Sin adjuntos");

// ── Prompts ──────────────────────────────────────────────────────

msg_n!(
    prompt_bounce_to,
    ["Bounce message to: ", "Bounce tagged messages to: "],
    [
        "Rebotar mensaje a: ",
        "Rebotar mensajes marcados a: "
    ]
);

/// Confirmation text before the trailing `?`.
pub fn prompt_bounce_confirm(single: bool, addresses: &str) -> String {
    let lead = match (lang(), single) {
        (Lang::En, true) => "Bounce message to",
        (Lang::En, false) => "Bounce messages to",
        (Lang::Es, true) => "Rebotar mensaje a",
        (Lang::Es, false) => "Rebotar mensajes a",
    };
    format!("{lead} {addresses}")
}

msg!(
    prompt_forward_as_attachments,
    "Forward as attachments?",
    "\u{bf}Reenviar como adjuntos?"
);
msg!(
    prompt_forward_mime_encapsulated,
    "Forward MIME encapsulated?",
    "\u{bf}Reenviar encapsulado en MIME?"
);
msg!(
    prompt_mime_forward_rest,
    "Can't decode all tagged attachments.  MIME-forward the others?",
    "No se pueden decodificar todos los adjuntos.  \u{bf}Reenviar los dem\u{e1}s como MIME?"
);
msg!(
    prompt_mime_encapsulate_rest,
    "Can't decode all tagged attachments.  MIME-encapsulate the others?",
    "No se pueden decodificar todos los adjuntos.  \u{bf}Encapsular los dem\u{e1}s en MIME?"
);

/// "Reply to <address>?"
pub fn prompt_reply_to(address: &str) -> String {
    match lang() {
        Lang::En => format!("Reply to {address}?"),
        Lang::Es => format!("\u{bf}Responder a {address}?"),
    }
}

msg!(yes, "yes", "s\u{ed}");
msg!(no, "no", "no");

// ── Status messages ──────────────────────────────────────────────

msg_n!(
    msg_bounced,
    ["Message bounced.", "Messages bounced."],
    ["Mensaje rebotado.", "Mensajes rebotados."]
);
msg_n!(
    msg_not_bounced,
    ["Message not bounced.", "Messages not bounced."],
    ["Mensaje no rebotado.", "Mensajes no rebotados."]
);
msg!(
    msg_not_forwarded,
    "Message not forwarded.",
    "Mensaje no reenviado."
);
msg!(msg_not_replied, "Reply not sent.", "Respuesta no enviada.");
msg!(
    warn_no_from,
    "Warning: message contains no From: header",
    "Aviso: el mensaje no tiene cabecera From:"
);

/// Placeholder written in place of a part that cannot be shown as text.
pub fn msg_attachment_placeholder(name: &str, mime: &str, size: &str) -> String {
    match lang() {
        Lang::En => format!("[-- Attachment: {name} ({mime}, {size}) --]"),
        Lang::Es => format!("[-- Adjunto: {name} ({mime}, {size}) --]"),
    }
}

// ── Errors ───────────────────────────────────────────────────────

msg!(
    err_bounce_only_messages,
    "You may only bounce message/rfc822 parts.",
    "Solo se pueden rebotar partes message/rfc822."
);
msg!(
    err_compose_to_sender_only_messages,
    "You may only compose to sender with message/rfc822 parts.",
    "Solo se puede escribir al remitente con partes message/rfc822."
);
msg!(
    err_nothing_selected,
    "No attachment selected and none tagged.",
    "Ning\u{fa}n adjunto seleccionado ni marcado."
);
msg!(
    err_address_parse,
    "Error parsing address!",
    "\u{a1}Error al analizar la direcci\u{f3}n!"
);
msg!(
    err_no_lists,
    "No mailing lists found!",
    "\u{a1}No se encontraron listas de correo!"
);
msg!(
    err_no_tagged_messages,
    "Can't find any tagged messages.",
    "No se encuentra ning\u{fa}n mensaje marcado."
);
msg_n!(
    err_bouncing,
    ["Error bouncing message!", "Error bouncing messages!"],
    [
        "\u{a1}Error al rebotar el mensaje!",
        "\u{a1}Error al rebotar los mensajes!"
    ]
);
msg_n!(
    err_resending,
    ["Error resending message!", "Error resending messages!"],
    [
        "\u{a1}Error al reenviar el mensaje!",
        "\u{a1}Error al reenviar los mensajes!"
    ]
);
msg!(
    err_file_not_found,
    "File not found",
    "Fichero no encontrado"
);
msg!(
    err_no_such_part,
    "No such attachment",
    "No existe ese adjunto"
);

/// "Bad IDN: '<value>'"
pub fn err_bad_idn(value: &str) -> String {
    match lang() {
        Lang::En => format!("Bad IDN: '{value}'"),
        Lang::Es => format!("IDN incorrecto: '{value}'"),
    }
}

/// "Can't create temporary file <path>"
pub fn err_temp_file(path: &Path) -> String {
    match lang() {
        Lang::En => format!("Can't create temporary file {}", path.display()),
        Lang::Es => format!(
            "No se puede crear el fichero temporal {}",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lang_from_code() {
        assert_eq!(Lang::from_code("en"), Some(Lang::En));
        assert_eq!(Lang::from_code("es"), Some(Lang::Es));
        assert_eq!(Lang::from_code("en_US.UTF-8"), Some(Lang::En));
        assert_eq!(Lang::from_code("es_ES"), Some(Lang::Es));
        assert_eq!(Lang::from_code("es-MX"), Some(Lang::Es));
        assert_eq!(Lang::from_code("fr"), None);
    }

    #[test]
    fn test_lang_code_roundtrip() {
        assert_eq!(Lang::En.code(), "en");
        assert_eq!(Lang::Es.code(), "es");
    }

    #[test]
    fn test_singular_plural() {
        if lang() == Lang::En {
            assert_eq!(msg_bounced(true), "Message bounced.");
            assert_eq!(msg_bounced(false), "Messages bounced.");
            assert_eq!(prompt_bounce_to(false), "Bounce tagged messages to: ");
        }
    }

    #[test]
    fn test_messages_return_strings() {
        assert!(!app_name().is_empty());
        assert!(!prompt_forward_as_attachments().is_empty());
        assert!(!err_nothing_selected().is_empty());
        assert!(prompt_bounce_confirm(true, "a@b.c").ends_with("a@b.c"));
    }
}

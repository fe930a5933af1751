//! Email address parsing (RFC 5322 §3.4), alias expansion and IDN encoding.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, SendError};

/// Aliases may refer to other aliases; stop following them past this depth.
const MAX_ALIAS_DEPTH: usize = 16;

/// A parsed email address.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`), or an alias name.
    pub address: String,
}

impl EmailAddress {
    /// Build an address without a display name.
    pub fn bare(address: impl Into<String>) -> Self {
        Self {
            display_name: String::new(),
            address: address.into(),
        }
    }

    /// Parse a single email address from a header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// If parsing fails, the raw string is stored as `address`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::bare("");
        }

        if let Some(angle_start) = trimmed.rfind('<') {
            if let Some(angle_end) = trimmed.rfind('>') {
                if angle_end > angle_start {
                    let addr = trimmed[angle_start + 1..angle_end].trim().to_string();
                    let name_part = trimmed[..angle_start].trim();
                    let display_name = strip_quotes(name_part);
                    return Self {
                        display_name,
                        address: addr,
                    };
                }
            }
        }

        Self::bare(trimmed)
    }

    /// Parse a comma-separated list of addresses.
    ///
    /// Handles quoted commas: `"Last, First" <a@b.com>, other@c.com`
    pub fn parse_list(raw: &str) -> Vec<Self> {
        split_list(raw)
            .iter()
            .map(|item| Self::parse(item))
            .filter(|addr| !addr.address.is_empty())
            .collect()
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else if self.display_name.contains([',', ';', '"', '<', '>', '@']) {
            format!(
                "\"{}\" <{}>",
                self.display_name.replace('"', "\\\""),
                self.address
            )
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }

    /// The part after `@`, if any.
    pub fn domain(&self) -> Option<&str> {
        self.address.rsplit_once('@').map(|(_, domain)| domain)
    }

    /// Case-insensitive comparison of the bare addresses.
    pub fn same_mailbox(&self, other: &str) -> bool {
        self.address.eq_ignore_ascii_case(other.trim())
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Parse a recipient line typed by the user.
///
/// Unlike [`EmailAddress::parse_list`] this is strict: unbalanced quotes or
/// angle brackets, embedded whitespace in an address, or an empty result
/// are all reported as [`SendError::AddressParse`].
pub fn parse_recipients(line: &str) -> Result<Vec<EmailAddress>> {
    let mut result = Vec::new();
    for item in split_list(line) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if item.matches('"').count() % 2 != 0
            || item.matches('<').count() != item.matches('>').count()
        {
            return Err(SendError::AddressParse);
        }
        let addr = EmailAddress::parse(item);
        if addr.address.is_empty() || addr.address.contains(char::is_whitespace) {
            return Err(SendError::AddressParse);
        }
        result.push(addr);
    }
    if result.is_empty() {
        return Err(SendError::AddressParse);
    }
    Ok(result)
}

/// Replace alias names with the addresses they stand for.
///
/// An entry expands when it has no display name, no `@` and matches an
/// alias key. Expansion is recursive; an alias already being expanded on
/// the current path is left as-is.
pub fn expand_aliases(
    addresses: Vec<EmailAddress>,
    aliases: &BTreeMap<String, String>,
) -> Vec<EmailAddress> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(addresses.len());
    for addr in addresses {
        expand_one(addr, aliases, &mut seen, 0, &mut out);
    }
    dedup_addresses(&mut out);
    out
}

fn expand_one(
    addr: EmailAddress,
    aliases: &BTreeMap<String, String>,
    seen: &mut HashSet<String>,
    depth: usize,
    out: &mut Vec<EmailAddress>,
) {
    let key = addr.address.to_lowercase();
    let target = (addr.display_name.is_empty() && !addr.address.contains('@'))
        .then(|| aliases.get(&key))
        .flatten();

    match target {
        Some(value) if depth < MAX_ALIAS_DEPTH && seen.insert(key.clone()) => {
            for member in EmailAddress::parse_list(value) {
                expand_one(member, aliases, seen, depth + 1, out);
            }
            seen.remove(&key);
        }
        _ => out.push(addr),
    }
}

/// Convert every domain to its ASCII (punycode) form.
///
/// On failure the offending address is reported in [`SendError::BadIdn`].
pub fn to_intl(addresses: &mut [EmailAddress]) -> Result<()> {
    for addr in addresses.iter_mut() {
        let Some((local, domain)) = addr.address.rsplit_once('@') else {
            continue;
        };
        if domain.is_ascii() {
            continue;
        }
        match idna::domain_to_ascii(domain) {
            Ok(ascii) if !ascii.is_empty() => {
                addr.address = format!("{local}@{ascii}");
            }
            _ => return Err(SendError::BadIdn(addr.address.clone())),
        }
    }
    Ok(())
}

/// Write a list back as a single header-style line.
pub fn format_list(addresses: &[EmailAddress]) -> String {
    addresses
        .iter()
        .map(EmailAddress::display)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Remove later duplicates (same bare address, case-insensitive).
pub fn dedup_addresses(addresses: &mut Vec<EmailAddress>) {
    let mut seen = HashSet::new();
    addresses.retain(|a| seen.insert(a.address.to_lowercase()));
}

/// Split on commas that are outside quotes and angle brackets.
fn split_list(raw: &str) -> Vec<String> {
    let mut results = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '<' if !in_quotes => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quotes => {
                in_angle = false;
                current.push(ch);
            }
            ',' if !in_quotes && !in_angle => {
                results.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    results.push(current);
    results
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_address() {
        let addr = EmailAddress::parse("User One <user1@example.com>");
        assert_eq!(addr.address, "user1@example.com");
        assert_eq!(addr.display_name, "User One");
    }

    #[test]
    fn test_parse_list_with_quoted_comma() {
        let list = EmailAddress::parse_list("\"Last, First\" <a@b.com>, other@c.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].display_name, "Last, First");
        assert_eq!(list[0].address, "a@b.com");
        assert_eq!(list[1].address, "other@c.com");
    }

    #[test]
    fn test_display_quotes_special_names() {
        let addr = EmailAddress {
            display_name: "Last, First".to_string(),
            address: "a@b.com".to_string(),
        };
        assert_eq!(addr.display(), "\"Last, First\" <a@b.com>");
    }

    #[test]
    fn test_parse_recipients_rejects_garbage() {
        assert!(matches!(parse_recipients(""), Err(SendError::AddressParse)));
        assert!(matches!(
            parse_recipients("Bob <bob@example.com"),
            Err(SendError::AddressParse)
        ));
        assert!(matches!(
            parse_recipients("two words@example.com"),
            Err(SendError::AddressParse)
        ));
        let ok = parse_recipients("bob@example.com, Ann <ann@example.com>").unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn test_expand_aliases_recursive() {
        let mut aliases = BTreeMap::new();
        aliases.insert("team".to_string(), "alice, bob@example.com".to_string());
        aliases.insert("alice".to_string(), "Alice <alice@example.com>".to_string());
        let out = expand_aliases(EmailAddress::parse_list("team, carol@example.com"), &aliases);
        let bare: Vec<_> = out.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(
            bare,
            vec!["alice@example.com", "bob@example.com", "carol@example.com"]
        );
    }

    #[test]
    fn test_expand_aliases_loop_is_left_alone() {
        let mut aliases = BTreeMap::new();
        aliases.insert("a".to_string(), "b".to_string());
        aliases.insert("b".to_string(), "a".to_string());
        let out = expand_aliases(vec![EmailAddress::bare("a")], &aliases);
        assert_eq!(out, vec![EmailAddress::bare("a")]);
    }

    #[test]
    fn test_to_intl_encodes_unicode_domain() {
        let mut list = vec![EmailAddress::bare("jose@b\u{fc}cher.de")];
        to_intl(&mut list).unwrap();
        assert_eq!(list[0].address, "jose@xn--bcher-kva.de");
    }

    #[test]
    fn test_to_intl_ascii_untouched() {
        let mut list = vec![EmailAddress::bare("plain@example.com")];
        to_intl(&mut list).unwrap();
        assert_eq!(list[0].address, "plain@example.com");
    }

    #[test]
    fn test_format_list() {
        let list = EmailAddress::parse_list("Ann <ann@example.com>, bob@example.com");
        assert_eq!(format_list(&list), "Ann <ann@example.com>, bob@example.com");
    }
}

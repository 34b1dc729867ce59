//! The canonical email message produced once per delivery.

use sha2::{Digest, Sha256};

/// Maximum excerpt length in characters.
const EXCERPT_MAX_CHARS: usize = 280;

/// An inbound email after normalization. Immutable for the rest of the
/// pipeline invocation.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient field; may hold several comma-separated addresses.
    pub to: String,
    /// Sender field as delivered ("Display Name <addr>" or bare address).
    pub from: String,
    pub subject: String,
    pub body_plain: String,
    pub body_html: String,
    /// Raw headers JSON as forwarded by the relay.
    pub raw_headers: String,
}

impl EmailMessage {
    /// First address of the recipient field.
    pub fn first_recipient(&self) -> &str {
        self.to.split(',').next().unwrap_or("").trim()
    }

    /// Bare sender address, display name stripped.
    pub fn sender_address(&self) -> String {
        split_address(&self.from).0
    }

    /// Sender display name, empty when the From field carries none.
    pub fn sender_display_name(&self) -> String {
        split_address(&self.from).1
    }

    /// Stored content: HTML when present, plain text otherwise.
    pub fn content(&self) -> &str {
        if !self.body_html.is_empty() {
            &self.body_html
        } else {
            &self.body_plain
        }
    }

    /// Short plain-text excerpt for list views.
    pub fn excerpt(&self) -> String {
        let text = if !self.body_plain.is_empty() {
            collapse_whitespace(&self.body_plain)
        } else {
            collapse_whitespace(&strip_tags(&self.body_html))
        };

        if text.chars().count() <= EXCERPT_MAX_CHARS {
            text
        } else {
            let truncated: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
            format!("{}…", truncated.trim_end())
        }
    }

    /// Stable key identifying the physical email for one user: a SHA-256
    /// over subject, content and the sender identity. The store's
    /// uniqueness constraint on `(user_id, dedup_key)` turns a re-delivery
    /// into a detectable duplicate instead of a second row.
    pub fn dedup_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.subject.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.content().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.sender_address().to_lowercase().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.sender_display_name().to_lowercase().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Splits "Display Name <addr>" into (addr, display name). A bare address
/// yields an empty display name.
fn split_address(from: &str) -> (String, String) {
    let from = from.trim();
    if let (Some(open), true) = (from.rfind('<'), from.ends_with('>')) {
        let address = from[open + 1..from.len() - 1].trim().to_string();
        let name = from[..open].trim().trim_matches('"').trim().to_string();
        (address, name)
    } else {
        (from.to_string(), String::new())
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Minimal tag stripper for excerpt fallback. Not a sanitizer; stored
/// content keeps the original HTML.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

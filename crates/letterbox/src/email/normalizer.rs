//! Request normalization: an ordered chain of parser strategies that turn
//! any supported wire encoding into one `InboundPayload`.
//!
//! Every strategy reads the same buffered body; nothing is consumed
//! destructively, so strategies are independent and the first one that
//! yields a complete payload (recipient, sender and subject all non-empty)
//! wins.

use std::collections::HashMap;

use thiserror::Error;

use super::message::EmailMessage;

/// Failure to extract a usable payload from the request body.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request body could not be parsed into a complete email payload")]
    Unsupported,
}

/// Raw fields extracted from a webhook delivery, before the message is
/// sealed. Carries the relay's signature triplet alongside the email
/// fields because both come out of the same parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundPayload {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body_plain: String,
    pub body_html: String,
    pub raw_headers: String,
    pub token: Option<String>,
    pub timestamp: Option<String>,
    pub signature: Option<String>,
}

impl InboundPayload {
    /// A payload is complete once recipient, sender and subject are known.
    pub fn is_complete(&self) -> bool {
        !self.to.is_empty() && !self.from.is_empty() && !self.subject.is_empty()
    }

    /// Seals the payload into the immutable canonical message.
    pub fn into_message(self) -> EmailMessage {
        EmailMessage {
            to: self.to,
            from: self.from,
            subject: self.subject,
            body_plain: self.body_plain,
            body_html: self.body_html,
            raw_headers: self.raw_headers,
        }
    }

    fn from_fields(fields: &HashMap<String, String>) -> Self {
        let first_of = |names: &[&str]| -> String {
            names
                .iter()
                .filter_map(|n| fields.get(*n))
                .find(|v| !v.is_empty())
                .cloned()
                .unwrap_or_default()
        };

        Self {
            to: first_of(&["recipient", "to"]),
            from: first_of(&["from", "sender"]),
            subject: first_of(&["subject"]),
            body_plain: first_of(&["body-plain", "text"]),
            body_html: first_of(&["body-html", "html", "stripped-html"]),
            raw_headers: first_of(&["message-headers"]),
            token: fields.get("token").filter(|v| !v.is_empty()).cloned(),
            timestamp: fields.get("timestamp").filter(|v| !v.is_empty()).cloned(),
            signature: fields.get("signature").filter(|v| !v.is_empty()).cloned(),
        }
    }
}

/// Parses the buffered body with every applicable strategy in order and
/// returns the first complete payload.
pub async fn normalize(content_type: Option<&str>, body: &[u8]) -> Result<InboundPayload, ParseError> {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();

    if content_type.contains("application/json") {
        if let Some(payload) = try_strategy("json", parse_json(body)) {
            return Ok(payload);
        }
    }

    if let Ok(boundary) = multer::parse_boundary(&content_type) {
        if let Some(payload) = try_strategy("multipart", parse_multipart(body, &boundary).await) {
            return Ok(payload);
        }
    }

    if content_type.contains("application/x-www-form-urlencoded") {
        if let Some(payload) = try_strategy("urlencoded", Some(parse_urlencoded(body))) {
            return Ok(payload);
        }
    }

    // Ambiguous or missing content type: a body that looks like a form
    // gets one last urlencoded attempt.
    if body.contains(&b'=') || body.contains(&b'&') {
        if let Some(payload) = try_strategy("raw-heuristic", Some(parse_urlencoded(body))) {
            return Ok(payload);
        }
    }

    tracing::debug!(
        content_type = %content_type,
        body_len = body.len(),
        "no parser strategy produced a complete payload"
    );
    Err(ParseError::Unsupported)
}

fn try_strategy(name: &str, fields: Option<HashMap<String, String>>) -> Option<InboundPayload> {
    let fields = fields?;
    let payload = InboundPayload::from_fields(&fields);
    if payload.is_complete() {
        tracing::debug!(strategy = name, "payload parsed");
        Some(payload)
    } else {
        tracing::debug!(strategy = name, "payload incomplete, trying next strategy");
        None
    }
}

fn parse_json(body: &[u8]) -> Option<HashMap<String, String>> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let object = value.as_object()?;

    let mut fields = HashMap::new();
    for (key, value) in object {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            // Relays deliver the signature timestamp as a bare number.
            serde_json::Value::Number(n) => n.to_string(),
            _ => continue,
        };
        fields.entry(key.to_ascii_lowercase()).or_insert(text);
    }
    Some(fields)
}

fn parse_urlencoded(body: &[u8]) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        fields
            .entry(key.to_ascii_lowercase())
            .or_insert_with(|| value.into_owned());
    }
    fields
}

async fn parse_multipart(body: &[u8], boundary: &str) -> Option<HashMap<String, String>> {
    let chunk = bytes::Bytes::copy_from_slice(body);
    let stream =
        futures_util::stream::once(async move { Ok::<_, std::convert::Infallible>(chunk) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = HashMap::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.name().map(|n| n.to_ascii_lowercase()) else {
                    continue;
                };
                match field.text().await {
                    Ok(text) => {
                        fields.entry(name).or_insert(text);
                    }
                    Err(e) => {
                        tracing::debug!(field = %name, error = %e, "unreadable multipart field");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "multipart parse aborted");
                break;
            }
        }
    }

    if fields.is_empty() {
        None
    } else {
        Some(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> InboundPayload {
        InboundPayload {
            to: "reader@in.letterbox.email".to_string(),
            from: "The Digest <digest@news.example>".to_string(),
            subject: "Issue #42".to_string(),
            body_plain: "hello".to_string(),
            body_html: "<p>hello</p>".to_string(),
            raw_headers: String::new(),
            token: Some("tok".to_string()),
            timestamp: Some("1700000000".to_string()),
            signature: Some("abcd".to_string()),
        }
    }

    #[tokio::test]
    async fn test_json_payload() {
        let body = serde_json::json!({
            "recipient": "reader@in.letterbox.email",
            "from": "The Digest <digest@news.example>",
            "subject": "Issue #42",
            "body-plain": "hello",
            "body-html": "<p>hello</p>",
            "token": "tok",
            "timestamp": 1700000000u64,
            "signature": "abcd",
        })
        .to_string();

        let payload = normalize(Some("application/json"), body.as_bytes())
            .await
            .unwrap();
        assert_eq!(payload, expected());
    }

    #[tokio::test]
    async fn test_urlencoded_payload_matches_json() {
        let body = "recipient=reader%40in.letterbox.email\
                    &from=The%20Digest%20%3Cdigest%40news.example%3E\
                    &subject=Issue%20%2342&body-plain=hello\
                    &body-html=%3Cp%3Ehello%3C%2Fp%3E\
                    &token=tok&timestamp=1700000000&signature=abcd";

        let payload = normalize(Some("application/x-www-form-urlencoded"), body.as_bytes())
            .await
            .unwrap();
        assert_eq!(payload, expected());
    }

    #[tokio::test]
    async fn test_multipart_payload_matches_json() {
        let b = "letterbox-test-boundary";
        let mut body = String::new();
        for (name, value) in [
            ("recipient", "reader@in.letterbox.email"),
            ("from", "The Digest <digest@news.example>"),
            ("subject", "Issue #42"),
            ("body-plain", "hello"),
            ("body-html", "<p>hello</p>"),
            ("token", "tok"),
            ("timestamp", "1700000000"),
            ("signature", "abcd"),
        ] {
            body.push_str(&format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{b}--\r\n"));

        let content_type = format!("multipart/form-data; boundary={b}");
        let payload = normalize(Some(&content_type), body.as_bytes())
            .await
            .unwrap();
        assert_eq!(payload, expected());
    }

    #[tokio::test]
    async fn test_raw_body_heuristic_without_content_type() {
        let body = "to=reader%40in.letterbox.email&sender=digest%40news.example&subject=Hi&text=plain";

        let payload = normalize(None, body.as_bytes()).await.unwrap();
        assert_eq!(payload.to, "reader@in.letterbox.email");
        assert_eq!(payload.from, "digest@news.example");
        assert_eq!(payload.subject, "Hi");
        assert_eq!(payload.body_plain, "plain");
    }

    #[tokio::test]
    async fn test_field_synonyms() {
        let body = "to=a%40b.c&from=d%40e.f&subject=s&text=plain&html=%3Cb%3Eh%3C%2Fb%3E";
        let payload = normalize(Some("application/x-www-form-urlencoded"), body.as_bytes())
            .await
            .unwrap();
        assert_eq!(payload.body_plain, "plain");
        assert_eq!(payload.body_html, "<b>h</b>");
    }

    #[tokio::test]
    async fn test_stripped_html_is_last_resort() {
        let body = "to=a%40b.c&from=d%40e.f&subject=s&stripped-html=%3Cp%3Es%3C%2Fp%3E";
        let payload = normalize(Some("application/x-www-form-urlencoded"), body.as_bytes())
            .await
            .unwrap();
        assert_eq!(payload.body_html, "<p>s</p>");
    }

    #[tokio::test]
    async fn test_json_with_wrong_content_type_falls_through() {
        // A JSON body under a form content type has no k=v pairs the
        // form parser understands, and no strategy completes.
        let body = r#"{"recipient": "a@b.c"}"#;
        let result = normalize(Some("application/x-www-form-urlencoded"), body.as_bytes()).await;
        assert!(matches!(result, Err(ParseError::Unsupported)));
    }

    #[tokio::test]
    async fn test_incomplete_payload_is_rejected() {
        let body = serde_json::json!({
            "recipient": "reader@in.letterbox.email",
            "from": "digest@news.example",
        })
        .to_string();

        let result = normalize(Some("application/json"), body.as_bytes()).await;
        assert!(matches!(result, Err(ParseError::Unsupported)));
    }

    #[tokio::test]
    async fn test_garbage_body_is_rejected() {
        let result = normalize(Some("text/plain"), b"not an email at all").await;
        assert!(matches!(result, Err(ParseError::Unsupported)));
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back_to_heuristic() {
        // Content type lies about JSON but the body is a plain form.
        let body = "to=a%40b.c&from=d%40e.f&subject=s";
        let payload = normalize(Some("application/json"), body.as_bytes())
            .await
            .unwrap();
        assert_eq!(payload.subject, "s");
    }
}

//! Builders and harness helpers for ingestion integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use bytes::Bytes;

use letterbox::db::source_repo::SourceRow;
use letterbox::db::user_repo::{self, UserRow};
use letterbox::db::{skip_repo, source_repo, Database};
use letterbox::{IngestConfig, Pipeline, RawRequest, SqliteStore};

/// An in-memory pipeline plus direct database access for assertions.
pub struct IngestHarness {
    pub store: SqliteStore,
    pub pipeline: Pipeline,
}

impl IngestHarness {
    /// Harness with test defaults (no signature enforcement).
    pub fn new() -> Self {
        Self::with_config(IngestConfig::for_tests())
    }

    pub fn with_config(config: IngestConfig) -> Self {
        let db = Database::open_in_memory().expect("Failed to create test database");
        let store = SqliteStore::new(db);
        let pipeline = Pipeline::new(Arc::new(config), Arc::new(store.clone()));
        Self { store, pipeline }
    }

    pub fn db(&self) -> &Database {
        self.store.database()
    }

    /// Creates a user and returns its id.
    pub fn seed_user(&self, id: &str, alias: &str) -> String {
        user_repo::insert(
            self.db(),
            &UserRow {
                id: id.to_string(),
                email_alias: alias.to_string(),
            },
        )
        .expect("Failed to seed user");
        id.to_string()
    }

    /// Subscribes a user to a plan.
    pub fn subscribe(&self, user_id: &str, plan_id: &str) {
        user_repo::add_subscription(self.db(), user_id, plan_id, "active")
            .expect("Failed to add subscription");
    }

    /// Inserts a custom plan row.
    pub fn seed_plan(&self, id: &str, max_sources: i64, max_newsletters_per_day: i64) {
        self.db()
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO plans (id, max_sources, max_newsletters_per_day)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![id, max_sources, max_newsletters_per_day],
                )?;
                Ok(())
            })
            .expect("Failed to seed plan");
    }

    /// Inserts an existing source row.
    pub fn seed_source(&self, source: &SourceRow) {
        source_repo::insert(self.db(), source).expect("Failed to seed source");
    }

    pub fn newsletter_count(&self, user_id: &str) -> u64 {
        letterbox::db::newsletter_repo::count_for_user(self.db(), user_id)
            .expect("Failed to count newsletters")
    }

    pub fn daily_count(&self, user_id: &str, date: &str) -> i64 {
        self.db()
            .with_conn(|conn| {
                Ok(conn
                    .query_row(
                        "SELECT newsletter_count FROM daily_counts
                         WHERE user_id = ?1 AND count_date = ?2",
                        [user_id, date],
                        |r| r.get(0),
                    )
                    .unwrap_or(0))
            })
            .expect("Failed to read daily count")
    }

    pub fn skip_reasons(&self, user_id: &str) -> Vec<String> {
        skip_repo::list_for_user(self.db(), user_id)
            .expect("Failed to list skips")
            .into_iter()
            .map(|row| row.skip_reason)
            .collect()
    }
}

impl Default for IngestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Which wire encoding a `WebhookRequest` builder should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Form,
    Multipart,
    /// Url-encoded body with no content type header.
    Raw,
}

/// Builder for webhook deliveries in any supported encoding.
pub struct WebhookRequest {
    fields: Vec<(String, String)>,
    encoding: Encoding,
}

impl WebhookRequest {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            fields: Vec::new(),
            encoding,
        }
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn to(self, value: &str) -> Self {
        self.field("recipient", value)
    }

    pub fn sender(self, value: &str) -> Self {
        self.field("from", value)
    }

    pub fn subject(self, value: &str) -> Self {
        self.field("subject", value)
    }

    pub fn text(self, value: &str) -> Self {
        self.field("body-plain", value)
    }

    pub fn html(self, value: &str) -> Self {
        self.field("body-html", value)
    }

    pub fn signed(self, token: &str, timestamp: &str, signature: &str) -> Self {
        self.field("token", token)
            .field("timestamp", timestamp)
            .field("signature", signature)
    }

    pub fn build(self) -> RawRequest {
        match self.encoding {
            Encoding::Json => {
                let map: serde_json::Map<String, serde_json::Value> = self
                    .fields
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::String(v)))
                    .collect();
                RawRequest {
                    content_type: Some("application/json".to_string()),
                    body: Bytes::from(serde_json::Value::Object(map).to_string()),
                }
            }
            Encoding::Form | Encoding::Raw => {
                let mut serializer = url::form_urlencoded::Serializer::new(String::new());
                for (k, v) in &self.fields {
                    serializer.append_pair(k, v);
                }
                let content_type = match self.encoding {
                    Encoding::Form => Some("application/x-www-form-urlencoded".to_string()),
                    _ => None,
                };
                RawRequest {
                    content_type,
                    body: Bytes::from(serializer.finish()),
                }
            }
            Encoding::Multipart => {
                let boundary = "letterbox-integration-boundary";
                let mut body = String::new();
                for (k, v) in &self.fields {
                    body.push_str(&format!(
                        "--{boundary}\r\nContent-Disposition: form-data; name=\"{k}\"\r\n\r\n{v}\r\n"
                    ));
                }
                body.push_str(&format!("--{boundary}--\r\n"));
                RawRequest {
                    content_type: Some(format!("multipart/form-data; boundary={boundary}")),
                    body: Bytes::from(body),
                }
            }
        }
    }
}

/// A complete, valid delivery for the default seeded reader.
pub fn sample_delivery(encoding: Encoding) -> RawRequest {
    WebhookRequest::new(encoding)
        .to("reader@in.letterbox.email")
        .sender("The Digest <digest@news.example>")
        .subject("Issue #1")
        .text("plain body")
        .html("<p>html body</p>")
        .build()
}

//! Satoshi Nakamoto quotes: loading, chat tracking and message text

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::utils::format::escape_html;

pub const QUOTE_SOURCE_URL: &str = "https://github.com/dergigi/QuotableSatoshi";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
    pub text: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub medium: Option<String>,
    /// Numeric in some files, a string in others
    #[serde(default)]
    pub post_id: Option<Value>,
}

#[derive(Debug, Error)]
pub enum QuoteLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

fn read_quotes(path: &Path) -> Result<Vec<Quote>, QuoteLoadError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| QuoteLoadError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| QuoteLoadError::Parse { path: display, source })
}

/// The loaded quote collection
#[derive(Debug, Clone, Default)]
pub struct QuoteBook {
    quotes: Vec<Quote>,
}

impl QuoteBook {
    pub fn new(quotes: Vec<Quote>) -> Self {
        Self { quotes }
    }

    /// Load the primary file, falling back to the secondary; empty if both fail
    pub fn load(primary: &Path, fallback: &Path) -> Self {
        match read_quotes(primary) {
            Ok(quotes) => {
                info!("Loaded {} quotes from {}", quotes.len(), primary.display());
                return Self::new(quotes);
            }
            Err(e) => error!("Error loading quotes: {}", e),
        }

        match read_quotes(fallback) {
            Ok(quotes) => {
                info!("Loaded {} quotes from {} (fallback)", quotes.len(), fallback.display());
                Self::new(quotes)
            }
            Err(e) => {
                error!("Error loading fallback quotes: {}", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn random(&self) -> Option<&Quote> {
        self.quotes.choose(&mut rand::thread_rng())
    }

    /// The quote whose text appears in a message the bot posted earlier
    pub fn find_in(&self, message_text: &str) -> Option<&Quote> {
        self.quotes
            .iter()
            .find(|q| !q.text.is_empty() && message_text.contains(&q.text))
    }
}

/// Chats receiving scheduled quotes and when each last got one
#[derive(Debug, Default)]
pub struct QuoteChats {
    chats: RwLock<HashMap<i64, Option<Instant>>>,
}

impl QuoteChats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the chat was not tracked before
    pub async fn track(&self, chat_id: i64) -> bool {
        let mut chats = self.chats.write().await;
        if chats.contains_key(&chat_id) {
            return false;
        }
        chats.insert(chat_id, None);
        true
    }

    pub async fn len(&self) -> usize {
        self.chats.read().await.len()
    }

    /// Chats never posted to, or last posted to at least `interval` ago
    pub async fn due(&self, now: Instant, interval: Duration) -> Vec<i64> {
        let chats = self.chats.read().await;
        let mut due: Vec<i64> = chats
            .iter()
            .filter(|(_, last)| match last {
                Some(last) => now.saturating_duration_since(*last) >= interval,
                None => true,
            })
            .map(|(chat_id, _)| *chat_id)
            .collect();
        due.sort_unstable();
        due
    }

    pub async fn mark_posted(&self, chat_id: i64, at: Instant) {
        self.chats.write().await.insert(chat_id, Some(at));
    }
}

/// Message ids already answered with a quote source
#[derive(Debug, Default)]
pub struct AnsweredSources {
    ids: Mutex<HashSet<(i64, i32)>>,
}

impl AnsweredSources {
    /// Returns true the first time a (chat, message) pair is seen
    pub async fn first_time(&self, chat_id: i64, message_id: i32) -> bool {
        self.ids.lock().await.insert((chat_id, message_id))
    }
}

/// "source" or "kaynak", in any case, anywhere in the text
pub fn is_source_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("source") || lower.contains("kaynak")
}

pub fn format_scheduled_quote(quote: &Quote) -> String {
    format!(
        "💭 <b>Satoshi Nakamoto'dan bir alıntı:</b>\n\n<i>{}</i>",
        escape_html(&quote.text)
    )
}

pub fn format_welcome(quote: &Quote) -> String {
    format!(
        "👋 Merhaba! Ben Bitcoin fiyatları ve Satoshi Nakamoto alıntıları paylaşan bir botum.\n\n\
         💬 <b>İlk Satoshi Alıntısı:</b>\n\n{}",
        escape_html(&quote.text)
    )
}

pub fn format_source(quote: &Quote) -> String {
    let mut message = format!("<b>Source:</b> {}\n", escape_html(&quote.date));
    if let Some(medium) = &quote.medium {
        message.push_str(&format!("<b>Medium:</b> {}\n", escape_html(medium)));
    }
    if let Some(post_id) = &quote.post_id {
        let post_id = match post_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        message.push_str(&format!("<b>Post ID:</b> {}\n", escape_html(&post_id)));
    }
    message.push_str(&format!("<b>More quotes:</b> {}", QUOTE_SOURCE_URL));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn book() -> QuoteBook {
        serde_json::from_value::<Vec<Quote>>(json!([
            { "text": "Lost coins only make everyone else's coins worth slightly more.", "date": "June 21, 2010", "medium": "bitcointalk", "post_id": 2627 },
            { "text": "It might make sense just to get some in case it catches on.", "date": "January 17, 2009", "medium": "p2p research" }
        ]))
        .map(QuoteBook::new)
        .unwrap()
    }

    #[test]
    fn test_find_quote_inside_bot_message() {
        let book = book();
        let posted = format_scheduled_quote(&book.quotes[1]);
        let found = book.find_in(&posted).unwrap();
        assert_eq!(found.date, "January 17, 2009");
        assert!(book.find_in("unrelated text").is_none());
    }

    #[test]
    fn test_source_formatting() {
        let source = format_source(&book().quotes[0]);
        assert!(source.contains("<b>Source:</b> June 21, 2010"));
        assert!(source.contains("<b>Medium:</b> bitcointalk"));
        assert!(source.contains("<b>Post ID:</b> 2627"));
        assert!(source.ends_with(QUOTE_SOURCE_URL));

        let without_post = format_source(&book().quotes[1]);
        assert!(!without_post.contains("Post ID"));
    }

    #[test]
    fn test_source_request_detection() {
        assert!(is_source_request("Source?"));
        assert!(is_source_request("bunun KAYNAK nedir"));
        assert!(!is_source_request("thanks"));
    }

    #[test]
    fn test_random_from_empty_book() {
        assert!(QuoteBook::default().random().is_none());
        assert!(book().random().is_some());
    }

    #[test]
    fn test_load_falls_back_then_gives_up() {
        let dir = std::env::temp_dir().join(format!("quotes-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let fallback = dir.join("quotes.json");
        std::fs::write(&fallback, r#"[{"text": "Bitcoin", "date": "2009"}]"#).unwrap();

        let loaded = QuoteBook::load(&dir.join("missing.json"), &fallback);
        assert_eq!(loaded.len(), 1);

        let empty = QuoteBook::load(&dir.join("a.json"), &dir.join("b.json"));
        assert!(empty.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_chat_tracking_and_due_times() {
        let chats = QuoteChats::new();
        assert!(chats.track(-1001).await);
        assert!(!chats.track(-1001).await);
        assert!(chats.track(-1002).await);

        let interval = Duration::from_secs(86_400);
        let now = Instant::now();
        assert_eq!(chats.due(now, interval).await, vec![-1002, -1001]);

        chats.mark_posted(-1001, now).await;
        assert_eq!(chats.due(now + Duration::from_secs(60), interval).await, vec![-1002]);
        assert_eq!(chats.due(now + interval, interval).await, vec![-1002, -1001]);
    }

    #[tokio::test]
    async fn test_source_answered_once() {
        let answered = AnsweredSources::default();
        assert!(answered.first_time(5, 10).await);
        assert!(!answered.first_time(5, 10).await);
        assert!(answered.first_time(6, 10).await);
    }
}

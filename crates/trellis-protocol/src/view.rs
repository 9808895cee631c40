//! Renderable units and the streamed UI event protocol.
//!
//! Renderable kinds are a closed tagged union resolved at compile time; no
//! component names are looked up by string at runtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event streamed while a gated tool generates its UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum UiEvent {
    /// Loading placeholder, always the first event of a gated stream.
    Pending,
    /// Intermediate renderable state.
    View(ViewContent),
    /// Authorization denial notice.
    Denied { message: String },
}

/// A renderable unit produced by tools and page guards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "content")]
pub enum ViewContent {
    /// Free-form markdown text.
    Markdown { text: String },
    /// Current quote for a tradable asset.
    StockQuote { symbol: String, price_cents: i64 },
    /// Confirmation card for a completed purchase.
    PurchaseReceipt {
        symbol: String,
        quantity: u32,
        total_cents: i64,
    },
    /// Confirmation card for a created reminder.
    ReminderCard {
        title: String,
        due_at: DateTime<Utc>,
    },
    /// Titles of documents surviving retrieval filtering.
    DocumentList { titles: Vec<String> },
    /// Fixed denial rendering for guarded pages.
    AccessDenied { message: String },
}

//! Built-in gated tools.

mod buy;
mod docs;
mod reminder;
mod share;

pub use buy::{BuyStockTool, QuoteSource, StaticQuotes};
pub use docs::SearchDocumentsTool;
pub use reminder::{CreateReminderTool, NewReminder, Reminder, ReminderError, ReminderService};
pub use share::ShareChatTool;

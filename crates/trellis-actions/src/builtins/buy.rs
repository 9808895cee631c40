//! Built-in tool for gated stock purchases.

use crate::context::ActionContext;
use crate::ledger::{LedgerError, PurchaseRecord, TradeLedger};
use crate::tool::{Tool, parse_args};
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use trellis_core::{ChatHistory, UiEmitter};
use trellis_protocol::{ChatMessage, RelationSpec, ToolError, ViewContent, object_ref};
use uuid::Uuid;

/// Price source for tradable assets.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Current price for a symbol, in cents.
    async fn price_cents(&self, symbol: &str) -> Result<i64, ToolError>;
}

/// Fixed quote table, for demos and tests.
#[derive(Debug, Default)]
pub struct StaticQuotes {
    prices: HashMap<String, i64>,
}

impl StaticQuotes {
    /// Empty quote table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a price for a symbol.
    pub fn with_price(mut self, symbol: &str, cents: i64) -> Self {
        self.prices.insert(symbol.to_uppercase(), cents);
        self
    }
}

#[async_trait]
impl QuoteSource for StaticQuotes {
    async fn price_cents(&self, symbol: &str) -> Result<i64, ToolError> {
        self.prices
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| ToolError::ExecutionFailed(format!("no quote for {symbol}")))
    }
}

/// Tool that buys shares of an asset once the gate allows it.
pub struct BuyStockTool {
    ledger: Arc<TradeLedger>,
    quotes: Arc<dyn QuoteSource>,
}

impl BuyStockTool {
    /// Build the tool over a ledger and quote source.
    pub fn new(ledger: Arc<TradeLedger>, quotes: Arc<dyn QuoteSource>) -> Self {
        Self { ledger, quotes }
    }
}

impl fmt::Debug for BuyStockTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BuyStockTool")
    }
}

/// Arguments for BuyStockTool.
#[derive(Debug, Serialize, Deserialize)]
struct BuyStockArgs {
    symbol: String,
    quantity: u32,
    #[serde(default)]
    client_order_id: Option<String>,
}

fn validate(args: &BuyStockArgs) -> Result<(), ToolError> {
    if args.symbol.is_empty()
        || args.symbol.len() > 6
        || !args.symbol.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ToolError::InvalidArguments(
            "symbol must be 1-6 alphanumeric characters".to_string(),
        ));
    }
    if args.quantity == 0 {
        return Err(ToolError::InvalidArguments(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Tool for BuyStockTool {
    fn name(&self) -> &str {
        "BuyStock"
    }

    fn description(&self) -> &str {
        "Buy shares of a stock for the current user"
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string", "description": "Ticker symbol, e.g. NVDA." },
                "quantity": { "type": "integer", "minimum": 1, "description": "Number of shares." },
                "client_order_id": { "type": "string", "description": "Idempotency key for the order." },
            },
            "required": ["symbol", "quantity"],
        })
    }

    fn relation_spec(&self, _ctx: &ActionContext, args: &Value) -> Result<RelationSpec, ToolError> {
        let input: BuyStockArgs = parse_args(args.clone())?;
        validate(&input)?;
        // The trading-window rule in the policy model consumes current_time.
        let mut context = Map::new();
        context.insert("current_time".to_string(), json!(Utc::now().to_rfc3339()));
        Ok(
            RelationSpec::new("can_buy", object_ref("asset", &input.symbol.to_lowercase()))
                .with_condition("inside_trading_window", context),
        )
    }

    async fn run(
        &self,
        ctx: &ActionContext,
        args: Value,
        ui: &UiEmitter,
        history: &ChatHistory,
    ) -> Result<String, ToolError> {
        let input: BuyStockArgs = parse_args(args)?;
        let subject = ctx.identity.current_subject().await.ok_or_else(|| {
            ToolError::ExecutionFailed("session subject unavailable".to_string())
        })?;

        let symbol = input.symbol.to_uppercase();
        let price_cents = self.quotes.price_cents(&symbol).await?;
        let total_cents = price_cents * i64::from(input.quantity);
        let client_order_id = input
            .client_order_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let record = PurchaseRecord {
            id: Uuid::new_v4(),
            user: subject.user_ref(),
            symbol: symbol.clone(),
            quantity: input.quantity,
            total_cents,
            client_order_id,
            created_at: Utc::now(),
        };
        self.ledger.append(record).map_err(|err| match err {
            LedgerError::DuplicateOrder(order_id) => {
                ToolError::ExecutionFailed(format!("order {order_id} was already recorded"))
            }
            other => ToolError::ExecutionFailed(other.to_string()),
        })?;
        info!(
            "purchase recorded (user={}, symbol={symbol}, quantity={})",
            subject.user_ref(),
            input.quantity
        );

        ui.view(ViewContent::PurchaseReceipt {
            symbol: symbol.clone(),
            quantity: input.quantity,
            total_cents,
        })
        .await;
        let summary = format!(
            "Bought {} share(s) of {symbol} for ${:.2}.",
            input.quantity,
            total_cents as f64 / 100.0
        );
        history.append(ChatMessage::assistant(summary.clone()));
        Ok(summary)
    }
}

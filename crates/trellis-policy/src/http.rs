//! HTTP policy client against an OpenFGA-shaped store API.

use crate::client::{
    BatchCheckItem, BatchCheckOutcome, CheckDecision, CheckRequest, PolicyClient, TupleWrites,
};
use crate::error::PolicyError;
use async_trait::async_trait;
use log::debug;
use serde_json::{Value, json};
use trellis_protocol::AccessTuple;

/// Policy client speaking JSON over HTTP to a relationship store.
///
/// One `reqwest::Client` instance is reused for every call; the client is
/// safe for concurrent use and holds no per-request state.
pub struct HttpPolicyClient {
    http: reqwest::Client,
    api_url: String,
    store_id: String,
    authorization_model_id: Option<String>,
    api_token: Option<String>,
}

impl HttpPolicyClient {
    /// Create a client for one store.
    pub fn new(api_url: impl Into<String>, store_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            store_id: store_id.into(),
            authorization_model_id: None,
            api_token: None,
        }
    }

    /// Build a client from the policy section of the config.
    pub fn from_config(config: &trellis_config::PolicyConfig) -> Self {
        let mut client = Self::new(config.api_url.clone(), config.store_id.clone());
        if let Some(model_id) = &config.authorization_model_id {
            client = client.with_authorization_model(model_id.clone());
        }
        if let Some(token) = &config.api_token {
            client = client.with_api_token(token.clone());
        }
        client
    }

    /// Pin the authorization model evaluated by the engine.
    pub fn with_authorization_model(mut self, model_id: impl Into<String>) -> Self {
        self.authorization_model_id = Some(model_id.into());
        self
    }

    /// Attach a bearer token to every request.
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/stores/{}/{operation}",
            self.api_url.trim_end_matches('/'),
            self.store_id
        )
    }

    async fn post(&self, operation: &str, body: Value) -> Result<Value, PolicyError> {
        let mut request = self.http.post(self.endpoint(operation)).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PolicyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PolicyClient for HttpPolicyClient {
    async fn check(&self, request: CheckRequest) -> Result<CheckDecision, PolicyError> {
        debug!("policy check (tuple={})", request.tuple);
        let body = check_body(&request.tuple, self.authorization_model_id.as_deref());
        let response = self.post("check", body).await?;
        let allowed = response
            .get("allowed")
            .and_then(Value::as_bool)
            .ok_or_else(|| PolicyError::Decode("check response missing allowed".to_string()))?;
        Ok(CheckDecision { allowed })
    }

    async fn batch_check(
        &self,
        items: Vec<BatchCheckItem>,
    ) -> Result<Vec<BatchCheckOutcome>, PolicyError> {
        debug!("policy batch check (items={})", items.len());
        let body = batch_body(&items, self.authorization_model_id.as_deref());
        let response = self.post("batch-check", body).await?;
        parse_batch_outcomes(&response, &items)
    }

    async fn write_tuples(&self, writes: TupleWrites) -> Result<(), PolicyError> {
        debug!(
            "policy write (writes={}, deletes={})",
            writes.writes.len(),
            writes.deletes.len()
        );
        let body = write_body(&writes, self.authorization_model_id.as_deref());
        self.post("write", body).await?;
        Ok(())
    }
}

/// Wire form of a tuple key.
fn tuple_key(tuple: &AccessTuple) -> Value {
    json!({
        "user": tuple.user,
        "relation": tuple.relation,
        "object": tuple.object,
    })
}

/// Body for a single check call.
fn check_body(tuple: &AccessTuple, model_id: Option<&str>) -> Value {
    let mut body = json!({ "tuple_key": tuple_key(tuple) });
    if let Some(condition) = &tuple.condition {
        body["context"] = Value::Object(condition.context.clone());
    }
    if let Some(model_id) = model_id {
        body["authorization_model_id"] = json!(model_id);
    }
    body
}

/// Body for a batched check call.
fn batch_body(items: &[BatchCheckItem], model_id: Option<&str>) -> Value {
    let checks = items
        .iter()
        .map(|item| {
            let mut check = json!({
                "tuple_key": tuple_key(&item.tuple),
                "correlation_id": item.correlation_id,
            });
            if let Some(condition) = &item.tuple.condition {
                check["context"] = Value::Object(condition.context.clone());
            }
            check
        })
        .collect::<Vec<_>>();
    let mut body = json!({ "checks": checks });
    if let Some(model_id) = model_id {
        body["authorization_model_id"] = json!(model_id);
    }
    body
}

/// Body for a write call.
fn write_body(writes: &TupleWrites, model_id: Option<&str>) -> Value {
    let keys = |tuples: &[AccessTuple]| {
        tuples
            .iter()
            .map(|tuple| {
                let mut key = tuple_key(tuple);
                if let Some(condition) = &tuple.condition {
                    key["condition"] = json!({
                        "name": condition.name,
                        "context": Value::Object(condition.context.clone()),
                    });
                }
                key
            })
            .collect::<Vec<_>>()
    };
    let mut body = json!({});
    if !writes.writes.is_empty() {
        body["writes"] = json!({ "tuple_keys": keys(&writes.writes) });
    }
    if !writes.deletes.is_empty() {
        body["deletes"] = json!({ "tuple_keys": keys(&writes.deletes) });
    }
    if let Some(model_id) = model_id {
        body["authorization_model_id"] = json!(model_id);
    }
    body
}

/// Decode the `result` map keyed by echoed correlation id.
///
/// Every submitted item must be echoed back; an item the engine did not
/// answer is a `MissingOutcome` error, never an implicit allow or deny.
fn parse_batch_outcomes(
    response: &Value,
    items: &[BatchCheckItem],
) -> Result<Vec<BatchCheckOutcome>, PolicyError> {
    let result = response
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| PolicyError::Decode("batch response missing result".to_string()))?;
    let mut outcomes = Vec::with_capacity(items.len());
    for item in items {
        let entry = result
            .get(&item.correlation_id.to_string())
            .ok_or(PolicyError::MissingOutcome(item.correlation_id))?;
        let allowed = entry
            .get("allowed")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        outcomes.push(BatchCheckOutcome {
            correlation_id: item.correlation_id,
            allowed,
        });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::{batch_body, check_body, parse_batch_outcomes, write_body};
    use crate::client::{BatchCheckItem, TupleWrites};
    use crate::error::PolicyError;
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};
    use trellis_protocol::{AccessTuple, RelationSpec};

    fn conditioned_tuple() -> AccessTuple {
        let mut context = Map::new();
        context.insert("current_time".to_string(), json!("2026-08-04T12:00:00Z"));
        RelationSpec::new("can_buy", "asset:nvda")
            .with_condition("inside_trading_window", context)
            .into_tuple("user:alice".to_string())
    }

    #[test]
    fn check_body_carries_context_and_model() {
        let body = check_body(&conditioned_tuple(), Some("model-1"));
        assert_eq!(body["tuple_key"]["user"], "user:alice");
        assert_eq!(body["tuple_key"]["relation"], "can_buy");
        assert_eq!(body["context"]["current_time"], "2026-08-04T12:00:00Z");
        assert_eq!(body["authorization_model_id"], "model-1");
    }

    #[test]
    fn batch_body_tags_every_item() {
        let items = vec![
            BatchCheckItem::new(AccessTuple::new("user:alice", "can_view", "doc:1")),
            BatchCheckItem::new(AccessTuple::new("user:alice", "can_view", "doc:2")),
        ];
        let body = batch_body(&items, None);
        let checks = body["checks"].as_array().expect("checks");
        assert_eq!(checks.len(), 2);
        assert_eq!(
            checks[0]["correlation_id"],
            json!(items[0].correlation_id.to_string())
        );
        assert_eq!(checks[1]["tuple_key"]["object"], "doc:2");
    }

    #[test]
    fn write_body_skips_empty_sections() {
        let writes = TupleWrites::add(vec![AccessTuple::new("user:bob", "viewer", "chat:1")]);
        let body = write_body(&writes, None);
        assert_eq!(body["writes"]["tuple_keys"][0]["relation"], "viewer");
        assert_eq!(body.get("deletes"), None);
    }

    #[test]
    fn batch_outcomes_correlate_by_echoed_id() {
        let items = vec![
            BatchCheckItem::new(AccessTuple::new("user:alice", "can_view", "doc:1")),
            BatchCheckItem::new(AccessTuple::new("user:alice", "can_view", "doc:2")),
        ];
        // Response order intentionally unrelated to submission order.
        let mut result = Map::new();
        result.insert(
            items[1].correlation_id.to_string(),
            json!({ "allowed": false }),
        );
        result.insert(
            items[0].correlation_id.to_string(),
            json!({ "allowed": true }),
        );
        let response = json!({ "result": result });

        let outcomes = parse_batch_outcomes(&response, &items).expect("outcomes");
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].correlation_id, items[0].correlation_id);
        assert_eq!(outcomes[0].allowed, true);
        assert_eq!(outcomes[1].correlation_id, items[1].correlation_id);
        assert_eq!(outcomes[1].allowed, false);
    }

    #[test]
    fn missing_echo_is_rejected() {
        let items = vec![
            BatchCheckItem::new(AccessTuple::new("user:alice", "can_view", "doc:1")),
            BatchCheckItem::new(AccessTuple::new("user:alice", "can_view", "doc:2")),
        ];
        let mut result = Map::new();
        result.insert(
            items[0].correlation_id.to_string(),
            json!({ "allowed": true }),
        );
        let response = json!({ "result": result });

        let err = parse_batch_outcomes(&response, &items).expect_err("missing echo");
        let PolicyError::MissingOutcome(correlation_id) = err else {
            panic!("expected missing outcome");
        };
        assert_eq!(correlation_id, items[1].correlation_id);
    }
}

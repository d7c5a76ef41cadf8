//! [`DealStore`] talking to a running CRM server over its GraphQL endpoint.

use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    deal::DealRecord,
    stage::Stage,
    store::{DealStore, StoreError, StoreResult},
};

pub const DEALS_QUERY: &str = "query PipelineDeals { crm { deals { id title amount stage \
company { name } contact { firstName lastName } } } }";

pub const MOVE_STAGE_MUTATION: &str = "mutation MoveDealStage($id: ID!, $stage: DealStage!) \
{ crm { moveDealStage(id: $id, stage: $stage) { id stage } } }";

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
    #[serde(default)]
    extensions: Option<GraphqlErrorExtensions>,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorExtensions {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Crm<T> {
    crm: T,
}

#[derive(Debug, Deserialize)]
struct DealsPayload {
    deals: Vec<DealRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovePayload {
    move_deal_stage: MovedDeal,
}

#[derive(Debug, Deserialize)]
struct MovedDeal {
    id: Uuid,
    stage: String,
}

#[derive(Clone, Debug)]
pub struct GraphqlDealStore {
    http: reqwest::Client,
    endpoint: String,
}

impl GraphqlDealStore {
    /// `base_url` is the server root; requests go to `{base_url}/graphql`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/graphql", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: Value) -> StoreResult<Value> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl DealStore for GraphqlDealStore {
    #[instrument(name = "client.fetch_all", skip_all, fields(endpoint = %self.endpoint))]
    async fn fetch_all(&self) -> StoreResult<Vec<DealRecord>> {
        let body = self.post(json!({ "query": DEALS_QUERY })).await?;
        decode_deals(body)
    }

    #[instrument(name = "client.update_stage", skip(self))]
    async fn update_stage(&self, id: Uuid, stage: Stage) -> StoreResult<()> {
        let body = self
            .post(json!({
                "query": MOVE_STAGE_MUTATION,
                "variables": { "id": id, "stage": stage.key() },
            }))
            .await?;
        decode_move(body, id, stage)
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> StoreResult<T> {
    let response: GraphqlResponse<T> =
        serde_json::from_value(body).map_err(|err| StoreError::Decode(err.to_string()))?;
    if let Some(first) = response.errors.first() {
        let code = first
            .extensions
            .as_ref()
            .and_then(|ext| ext.code.as_deref());
        debug!(?code, message = %first.message, "graphql error response");
        return Err(StoreError::Rejected(first.message.clone()));
    }
    response
        .data
        .ok_or_else(|| StoreError::Decode("response carried neither data nor errors".into()))
}

/// Decode a `crm { deals }` response body.
pub fn decode_deals(body: Value) -> StoreResult<Vec<DealRecord>> {
    decode::<Crm<DealsPayload>>(body).map(|payload| payload.crm.deals)
}

/// Decode a `moveDealStage` response body for the move of `id` to `stage`.
pub fn decode_move(body: Value, id: Uuid, stage: Stage) -> StoreResult<()> {
    let moved = match decode::<Crm<MovePayload>>(body) {
        Ok(payload) => payload.crm.move_deal_stage,
        Err(StoreError::Rejected(message)) if message.eq_ignore_ascii_case("deal not found") => {
            return Err(StoreError::NotFound(id));
        }
        Err(err) => return Err(err),
    };
    if moved.id != id || moved.stage != stage.key() {
        return Err(StoreError::Decode(format!(
            "server answered with deal {} in {}",
            moved.id, moved.stage
        )));
    }
    Ok(())
}

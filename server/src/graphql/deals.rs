use std::collections::{HashMap, HashSet};

use async_graphql::{Context, Enum, ID, InputObject, Object, SimpleObject};
use chrono::Utc;
use entity::{company, contact, deal};
use platform_api::{ApiError, ApiResult};
use products_crm::{
    Deal, DealQuery, DealStats, Stage, ingest, partition,
    persistence::{load_records, to_record},
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, EntityTrait,
    TransactionTrait, prelude::DateTimeWithTimeZone,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{database, db_error, parse_id};

const MAX_TITLE_LEN: usize = 256;

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum DealStage {
    Lead,
    Qualified,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl From<Stage> for DealStage {
    fn from(value: Stage) -> Self {
        match value {
            Stage::Lead => DealStage::Lead,
            Stage::Qualified => DealStage::Qualified,
            Stage::Negotiation => DealStage::Negotiation,
            Stage::ClosedWon => DealStage::ClosedWon,
            Stage::ClosedLost => DealStage::ClosedLost,
        }
    }
}

impl From<DealStage> for Stage {
    fn from(value: DealStage) -> Self {
        match value {
            DealStage::Lead => Stage::Lead,
            DealStage::Qualified => Stage::Qualified,
            DealStage::Negotiation => Stage::Negotiation,
            DealStage::ClosedWon => Stage::ClosedWon,
            DealStage::ClosedLost => Stage::ClosedLost,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DealCompany")]
pub struct DealCompanyNode {
    pub name: String,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DealContact")]
pub struct DealContactNode {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Deal")]
pub struct DealNode {
    pub id: ID,
    pub title: String,
    pub amount: i64,
    pub stage: DealStage,
    pub company: Option<DealCompanyNode>,
    pub contact: Option<DealContactNode>,
}

impl From<Deal> for DealNode {
    fn from(deal: Deal) -> Self {
        Self {
            id: ID::from(deal.id.to_string()),
            title: deal.title,
            amount: deal.amount,
            stage: deal.stage.into(),
            company: deal.company.map(|company| DealCompanyNode { name: company.name }),
            contact: deal.contact.map(|contact| DealContactNode {
                first_name: contact.first_name,
                last_name: contact.last_name,
            }),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineStage")]
pub struct PipelineStageNode {
    pub key: String,
    pub title: String,
    pub stage: DealStage,
    pub closed: bool,
}

impl From<Stage> for PipelineStageNode {
    fn from(stage: Stage) -> Self {
        Self {
            key: stage.key().to_string(),
            title: stage.title().to_string(),
            stage: stage.into(),
            closed: stage.is_closed(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineColumn")]
pub struct PipelineColumnNode {
    pub stage: PipelineStageNode,
    pub total_count: i32,
    pub total_amount: i64,
    pub deals: Vec<DealNode>,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "PipelineBoard")]
pub struct PipelineBoardNode {
    pub columns: Vec<PipelineColumnNode>,
    pub total_count: i32,
    pub total_amount: i64,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "StageTotal")]
pub struct StageTotalNode {
    pub stage: DealStage,
    pub count: i32,
    pub value: i64,
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "DealStats")]
pub struct DealStatsNode {
    pub total_deals: i32,
    pub total_value: i64,
    pub by_stage: Vec<StageTotalNode>,
    pub closed_won_value: i64,
    pub pipeline_value: i64,
}

impl From<DealStats> for DealStatsNode {
    fn from(stats: DealStats) -> Self {
        Self {
            total_deals: count_i32(stats.total_deals),
            total_value: stats.total_value,
            by_stage: stats
                .by_stage
                .into_iter()
                .map(|total| StageTotalNode {
                    stage: total.stage.into(),
                    count: count_i32(total.count),
                    value: total.value,
                })
                .collect(),
            closed_won_value: stats.closed_won_value,
            pipeline_value: stats.pipeline_value,
        }
    }
}

#[derive(Clone, Debug, InputObject)]
pub struct DealInput {
    pub title: String,
    pub amount: i64,
    /// Defaults to `LEAD`.
    pub stage: Option<DealStage>,
    pub company_id: Option<ID>,
    pub contact_id: Option<ID>,
}

/// Apply the board's search box semantics to a query argument.
fn narrow(deals: Vec<Deal>, q: Option<&str>) -> Vec<Deal> {
    match q.and_then(DealQuery::parse) {
        Some(query) => deals.into_iter().filter(|deal| query.matches(deal)).collect(),
        None => deals,
    }
}

#[derive(Default)]
pub struct CrmQuery;

#[derive(Default)]
pub struct CrmMutation;

#[Object]
impl CrmQuery {
    /// Every deal, newest first, optionally narrowed by a search query.
    #[instrument(name = "crm.deals", skip_all)]
    async fn deals(&self, ctx: &Context<'_>, q: Option<String>) -> ApiResult<Vec<DealNode>> {
        let db = database(ctx)?;
        let deals = load_deals(db.as_ref()).await?;
        Ok(narrow(deals, q.as_deref())
            .into_iter()
            .map(DealNode::from)
            .collect())
    }

    async fn pipeline_stages(&self) -> Vec<PipelineStageNode> {
        Stage::ALL.into_iter().map(PipelineStageNode::from).collect()
    }

    #[instrument(name = "crm.pipelineBoard", skip(self, ctx))]
    async fn pipeline_board(
        &self,
        ctx: &Context<'_>,
        q: Option<String>,
        stage_keys: Option<Vec<String>>,
    ) -> ApiResult<PipelineBoardNode> {
        let db = database(ctx)?;
        let stages = select_stage_sequence(stage_keys.as_deref())?;
        let deals = load_deals(db.as_ref()).await?;
        let visible = narrow(deals, q.as_deref());
        let columns: Vec<PipelineColumnNode> = partition(&visible, &stages)
            .into_iter()
            .map(|group| PipelineColumnNode {
                stage: group.stage.into(),
                total_count: count_i32(group.deals.len()),
                total_amount: group.deals.iter().map(|deal| deal.amount).sum(),
                deals: group.deals.into_iter().map(DealNode::from).collect(),
            })
            .collect();
        Ok(PipelineBoardNode {
            total_count: columns.iter().map(|column| column.total_count).sum(),
            total_amount: columns.iter().map(|column| column.total_amount).sum(),
            columns,
        })
    }

    #[instrument(name = "crm.dealStats", skip_all)]
    async fn deal_stats(&self, ctx: &Context<'_>) -> ApiResult<DealStatsNode> {
        let db = database(ctx)?;
        let deals = load_deals(db.as_ref()).await?;
        Ok(DealStats::compute(&deals).into())
    }
}

#[Object]
impl CrmMutation {
    #[instrument(name = "crm.moveDealStage", skip(self, ctx))]
    async fn move_deal_stage(
        &self,
        ctx: &Context<'_>,
        id: ID,
        stage: DealStage,
    ) -> ApiResult<DealNode> {
        let db = database(ctx)?;
        let deal_id = parse_id(&id)?;
        let model = move_stage(db.as_ref(), deal_id, stage.into()).await?;
        deal_node(db.as_ref(), model).await
    }

    #[instrument(name = "crm.createDeal", skip_all)]
    async fn create_deal(&self, ctx: &Context<'_>, input: DealInput) -> ApiResult<DealNode> {
        let db = database(ctx)?;
        let fields = DealFields::validate(db.as_ref(), input).await?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let model = deal::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(fields.title),
            amount: Set(fields.amount),
            stage: Set(fields.stage.into()),
            company_id: Set(fields.company_id),
            contact_id: Set(fields.contact_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        info!(deal_id = %model.id, "deal created");
        deal_node(db.as_ref(), model).await
    }

    #[instrument(name = "crm.updateDeal", skip(self, ctx, input))]
    async fn update_deal(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: DealInput,
    ) -> ApiResult<DealNode> {
        let db = database(ctx)?;
        let deal_id = parse_id(&id)?;
        let fields = DealFields::validate(db.as_ref(), input).await?;
        let txn = db.begin().await.map_err(db_error)?;
        let existing = deal::Entity::find_by_id(deal_id)
            .one(&txn)
            .await
            .map_err(db_error)?
            .ok_or(ApiError::NotFound("deal"))?;
        let mut active: deal::ActiveModel = existing.into();
        active.title = Set(fields.title);
        active.amount = Set(fields.amount);
        active.stage = Set(fields.stage.into());
        active.company_id = Set(fields.company_id);
        active.contact_id = Set(fields.contact_id);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(db_error)?;
        txn.commit().await.map_err(db_error)?;
        deal_node(db.as_ref(), updated).await
    }

    #[instrument(name = "crm.deleteDeal", skip(self, ctx))]
    async fn delete_deal(&self, ctx: &Context<'_>, id: ID) -> ApiResult<bool> {
        let db = database(ctx)?;
        let deal_id = parse_id(&id)?;
        let result = deal::Entity::delete_by_id(deal_id)
            .exec(db.as_ref())
            .await
            .map_err(db_error)?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound("deal"));
        }
        info!(%deal_id, "deal deleted");
        Ok(true)
    }
}

/// Validated create/update payload.
struct DealFields {
    title: String,
    amount: i64,
    stage: Stage,
    company_id: Option<Uuid>,
    contact_id: Option<Uuid>,
}

impl DealFields {
    async fn validate(db: &DatabaseConnection, input: DealInput) -> ApiResult<Self> {
        let title = validate_title(&input.title)?;
        if input.amount < 0 {
            return Err(ApiError::validation("amount must be >= 0"));
        }
        let company_id = optional_id(input.company_id.as_ref())?;
        let contact_id = optional_id(input.contact_id.as_ref())?;
        if let Some(id) = company_id {
            company::Entity::find_by_id(id)
                .one(db)
                .await
                .map_err(db_error)?
                .ok_or(ApiError::NotFound("company"))?;
        }
        if let Some(id) = contact_id {
            contact::Entity::find_by_id(id)
                .one(db)
                .await
                .map_err(db_error)?
                .ok_or(ApiError::NotFound("contact"))?;
        }
        Ok(Self {
            title,
            amount: input.amount,
            stage: input.stage.map(Stage::from).unwrap_or(Stage::Lead),
            company_id,
            contact_id,
        })
    }
}

fn validate_title(value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("title cannot be blank"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::validation(format!(
            "title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Blank ids mean "no reference".
fn optional_id(id: Option<&ID>) -> ApiResult<Option<Uuid>> {
    match id {
        Some(id) if !id.trim().is_empty() => parse_id(id).map(Some),
        _ => Ok(None),
    }
}

fn select_stage_sequence(requested: Option<&[String]>) -> ApiResult<Vec<Stage>> {
    let Some(keys) = requested else {
        return Ok(Stage::ALL.to_vec());
    };
    if keys.is_empty() {
        return Err(ApiError::validation(
            "stageKeys must contain at least one value",
        ));
    }
    let mut seen = HashSet::new();
    let mut sequence = Vec::with_capacity(keys.len());
    for key in keys {
        let normalized = key.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ApiError::validation("stageKeys cannot contain blank values"));
        }
        let stage = Stage::from_key(&normalized)
            .ok_or_else(|| ApiError::validation(format!("unknown stage key {normalized}")))?;
        if seen.insert(stage) {
            sequence.push(stage);
        }
    }
    Ok(sequence)
}

async fn load_deals(db: &DatabaseConnection) -> ApiResult<Vec<Deal>> {
    let records = load_records(db).await.map_err(db_error)?;
    Ok(ingest(records))
}

async fn move_stage(db: &DatabaseConnection, deal_id: Uuid, stage: Stage) -> ApiResult<deal::Model> {
    let txn = db.begin().await.map_err(db_error)?;
    let existing = deal::Entity::find_by_id(deal_id)
        .one(&txn)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("deal"))?;
    let from = Stage::from(existing.stage);
    let mut active: deal::ActiveModel = existing.into();
    active.stage = Set(stage.into());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await.map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;
    info!(%deal_id, %from, to = %stage, "deal stage moved");
    Ok(updated)
}

async fn deal_node<C: ConnectionTrait>(db: &C, model: deal::Model) -> ApiResult<DealNode> {
    let mut companies = HashMap::new();
    if let Some(id) = model.company_id {
        if let Some(found) = company::Entity::find_by_id(id).one(db).await.map_err(db_error)? {
            companies.insert(id, found);
        }
    }
    let mut contacts = HashMap::new();
    if let Some(id) = model.contact_id {
        if let Some(found) = contact::Entity::find_by_id(id).one(db).await.map_err(db_error)? {
            contacts.insert(id, found);
        }
    }
    let record = to_record(model, &companies, &contacts);
    let deal = Deal::try_from(record).map_err(|reason| {
        ApiError::internal(anyhow::anyhow!("stored deal cannot be shown: {reason:?}"))
    })?;
    Ok(deal.into())
}

fn count_i32(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

mod deals;

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, ID, Object, Schema, SimpleObject};
use platform_api::{ApiError, ApiResult};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use deals::{CrmMutation, CrmQuery};

pub type SchemaType = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(db: Arc<DatabaseConnection>) -> SchemaType {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .finish()
}

/// SDL of the schema; resolvers are never run, so no database is attached.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .finish()
        .sdl()
}

#[derive(Default)]
pub struct QueryRoot;

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    #[instrument(name = "graphql.health", skip_all)]
    async fn health(&self) -> ApiResult<HealthPayload> {
        Ok(HealthPayload { ok: true })
    }

    #[instrument(name = "graphql.version", skip_all)]
    async fn version(&self) -> ApiResult<String> {
        Ok(env!("CARGO_PKG_VERSION").to_string())
    }

    async fn crm(&self) -> CrmQuery {
        CrmQuery
    }
}

#[Object]
impl MutationRoot {
    async fn crm(&self) -> CrmMutation {
        CrmMutation
    }
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct HealthPayload {
    pub ok: bool,
}

fn database<'a>(ctx: &Context<'a>) -> ApiResult<&'a Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("database handle missing from schema data")))
}

fn db_error(err: DbErr) -> ApiError {
    ApiError::internal(err.into())
}

fn parse_id(id: &ID) -> ApiResult<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| ApiError::BadRequest(id.to_string()))
}

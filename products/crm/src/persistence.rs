//! Postgres-backed [`DealStore`] on sea-orm.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use entity::{company, contact, deal};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    deal::{CompanyRef, ContactRef, DealRecord},
    stage::Stage,
    store::{DealStore, StoreError, StoreResult},
};

#[derive(Clone, Debug)]
pub struct SeaOrmDealStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmDealStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DealStore for SeaOrmDealStore {
    #[instrument(name = "store.fetch_all", skip_all)]
    async fn fetch_all(&self) -> StoreResult<Vec<DealRecord>> {
        load_records(self.db.as_ref()).await.map_err(StoreError::from)
    }

    #[instrument(name = "store.update_stage", skip(self))]
    async fn update_stage(&self, id: Uuid, stage: Stage) -> StoreResult<()> {
        let changed = set_stage(self.db.as_ref(), id, stage).await?;
        if changed {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }
}

/// Write `stage` to one deal. `false` when no row has that id.
pub async fn set_stage<C>(db: &C, id: Uuid, stage: Stage) -> Result<bool, sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    let result = deal::Entity::update_many()
        .set(deal::ActiveModel {
            stage: Set(stage.into()),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .filter(deal::Column::Id.eq(id))
        .exec(db)
        .await?;
    debug!(%id, %stage, rows = result.rows_affected, "deal stage written");
    Ok(result.rows_affected > 0)
}

/// Every deal, newest first, with company and contact names attached.
pub async fn load_records<C>(db: &C) -> Result<Vec<DealRecord>, sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    let deals = deal::Entity::find()
        .order_by_desc(deal::Column::CreatedAt)
        .order_by_asc(deal::Column::Id)
        .all(db)
        .await?;

    let company_ids = unique_ids(deals.iter().filter_map(|model| model.company_id));
    let contact_ids = unique_ids(deals.iter().filter_map(|model| model.contact_id));

    let companies: HashMap<Uuid, company::Model> = if company_ids.is_empty() {
        HashMap::new()
    } else {
        company::Entity::find()
            .filter(company::Column::Id.is_in(company_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, model))
            .collect()
    };
    let contacts: HashMap<Uuid, contact::Model> = if contact_ids.is_empty() {
        HashMap::new()
    } else {
        contact::Entity::find()
            .filter(contact::Column::Id.is_in(contact_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, model))
            .collect()
    };

    Ok(deals
        .into_iter()
        .map(|model| to_record(model, &companies, &contacts))
        .collect())
}

fn unique_ids(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub fn to_record(
    model: deal::Model,
    companies: &HashMap<Uuid, company::Model>,
    contacts: &HashMap<Uuid, contact::Model>,
) -> DealRecord {
    let company = model
        .company_id
        .and_then(|id| companies.get(&id))
        .map(|company| CompanyRef {
            name: company.name.clone(),
        });
    let contact = model
        .contact_id
        .and_then(|id| contacts.get(&id))
        .map(|contact| ContactRef {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
        });
    DealRecord {
        id: model.id,
        title: model.title,
        amount: model.amount,
        stage: Stage::from(model.stage).key().to_string(),
        company,
        contact,
    }
}

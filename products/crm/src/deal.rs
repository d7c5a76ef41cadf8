use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::stage::Stage;

/// Display-only reference to the deal's company.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CompanyRef {
    pub name: String,
}

/// Display-only reference to the deal's contact.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRef {
    pub first_name: String,
    pub last_name: String,
}

impl ContactRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub amount: i64,
    pub stage: Stage,
    pub company: Option<CompanyRef>,
    pub contact: Option<ContactRef>,
}

/// A deal as a store hands it over, before the stage key is checked.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    pub id: Uuid,
    pub title: String,
    pub amount: i64,
    pub stage: String,
    pub company: Option<CompanyRef>,
    pub contact: Option<ContactRef>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RejectReason {
    UnknownStage(String),
    NegativeAmount(i64),
}

impl TryFrom<DealRecord> for Deal {
    type Error = RejectReason;

    fn try_from(record: DealRecord) -> Result<Self, Self::Error> {
        let stage =
            Stage::from_key(&record.stage).ok_or(RejectReason::UnknownStage(record.stage))?;
        if record.amount < 0 {
            return Err(RejectReason::NegativeAmount(record.amount));
        }
        Ok(Deal {
            id: record.id,
            title: record.title,
            amount: record.amount,
            stage,
            company: record.company,
            contact: record.contact,
        })
    }
}

impl From<Deal> for DealRecord {
    fn from(deal: Deal) -> Self {
        DealRecord {
            id: deal.id,
            title: deal.title,
            amount: deal.amount,
            stage: deal.stage.key().to_string(),
            company: deal.company,
            contact: deal.contact,
        }
    }
}

/// Convert store records into board deals, dropping (and logging) any record
/// that cannot be placed on the board. Order is preserved.
pub fn ingest(records: Vec<DealRecord>) -> Vec<Deal> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id;
            match Deal::try_from(record) {
                Ok(deal) => Some(deal),
                Err(reason) => {
                    warn!(deal_id = %id, ?reason, "dropping deal that cannot be placed on the board");
                    None
                }
            }
        })
        .collect()
}

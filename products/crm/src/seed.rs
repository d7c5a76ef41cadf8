//! Demo data set: five companies, five contacts and one deal per stage.

use chrono::{Duration, Utc};
use entity::{company, contact, deal};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use tracing::info;
use uuid::Uuid;

use crate::stage::Stage;

const COMPANIES: [(&str, &str, &str); 5] = [
    ("Stark Industries", "starkindustries.com", "Technology"),
    ("Acme Corporation", "acmecorp.com", "Manufacturing"),
    ("Wayne Enterprises", "wayneenterprises.com", "Finance"),
    ("Looney Logistics", "looneylogistics.com", "Logistics"),
    ("Pym Technologies", "pymtech.com", "Research"),
];

/// First name, last name, email, phone, index into `COMPANIES`.
const CONTACTS: [(&str, &str, &str, &str, usize); 5] = [
    ("Tony", "Stark", "tony.stark@starkindustries.com", "555-1001", 0),
    ("Bugs", "Bunny", "bugs.bunny@looneylogistics.com", "555-1002", 3),
    ("Bruce", "Wayne", "bruce.wayne@wayneenterprises.com", "555-1003", 2),
    ("Daffy", "Duck", "daffy.duck@looneylogistics.com", "555-1004", 3),
    ("Hope", "Van Dyne", "hope.vandyne@pymtech.com", "555-1005", 4),
];

/// Title, amount, stage, company index, contact index.
const DEALS: [(&str, i64, Stage, usize, usize); 5] = [
    ("Arc Reactor Development", 500_000, Stage::Qualified, 0, 0),
    ("Logistics Partnership", 150_000, Stage::Lead, 3, 1),
    ("Financial Audit", 75_000, Stage::Negotiation, 2, 2),
    ("Warehouse Expansion", 120_000, Stage::ClosedWon, 3, 3),
    ("Quantum Research Funding", 300_000, Stage::ClosedLost, 4, 4),
];

#[derive(Debug, Clone)]
pub struct SeededCrmRecords {
    pub companies: Vec<company::Model>,
    pub contacts: Vec<contact::Model>,
    pub deals: Vec<deal::Model>,
}

impl SeededCrmRecords {
    pub fn deal_titled(&self, title: &str) -> Option<&deal::Model> {
        self.deals.iter().find(|model| model.title == title)
    }
}

/// Insert the demo records in one transaction. Later rows get later
/// timestamps so the newest-first listing is stable.
pub async fn seed_crm_demo(db: &DatabaseConnection) -> Result<SeededCrmRecords, DbErr> {
    let txn = db.begin().await?;
    let base = Utc::now();
    let at = |offset: usize| -> DateTimeWithTimeZone {
        (base + Duration::seconds(offset as i64)).into()
    };

    let mut companies = Vec::with_capacity(COMPANIES.len());
    for (index, (name, domain, industry)) in COMPANIES.into_iter().enumerate() {
        let model = company::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.into()),
            domain: Set(Some(domain.into())),
            industry: Set(Some(industry.into())),
            created_at: Set(at(index)),
            updated_at: Set(at(index)),
        }
        .insert(&txn)
        .await?;
        companies.push(model);
    }

    let mut contacts = Vec::with_capacity(CONTACTS.len());
    for (index, (first, last, email, phone, company)) in CONTACTS.into_iter().enumerate() {
        let model = contact::ActiveModel {
            id: Set(Uuid::new_v4()),
            first_name: Set(first.into()),
            last_name: Set(last.into()),
            email: Set(email.into()),
            phone: Set(Some(phone.into())),
            company_id: Set(Some(companies[company].id)),
            created_at: Set(at(index)),
            updated_at: Set(at(index)),
        }
        .insert(&txn)
        .await?;
        contacts.push(model);
    }

    let mut deals = Vec::with_capacity(DEALS.len());
    for (index, (title, amount, stage, company, contact)) in DEALS.into_iter().enumerate() {
        let model = deal::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.into()),
            amount: Set(amount),
            stage: Set(stage.into()),
            company_id: Set(Some(companies[company].id)),
            contact_id: Set(Some(contacts[contact].id)),
            created_at: Set(at(index)),
            updated_at: Set(at(index)),
        }
        .insert(&txn)
        .await?;
        deals.push(model);
    }

    txn.commit().await?;
    info!(
        companies = companies.len(),
        contacts = contacts.len(),
        deals = deals.len(),
        "crm demo data seeded"
    );
    Ok(SeededCrmRecords {
        companies,
        contacts,
        deals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_gets_one_demo_deal() {
        let mut stages: Vec<Stage> = DEALS.iter().map(|deal| deal.2).collect();
        stages.sort();
        assert_eq!(stages, Stage::ALL.to_vec());
    }

    #[test]
    fn demo_references_point_at_existing_rows() {
        assert!(CONTACTS.iter().all(|contact| contact.4 < COMPANIES.len()));
        assert!(
            DEALS
                .iter()
                .all(|deal| deal.3 < COMPANIES.len() && deal.4 < CONTACTS.len())
        );
    }
}

//! Render-ready projection of the board.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    deal::Deal,
    partition::{StageGroup, StageGroups},
    stage::Stage,
};

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealCard {
    pub id: Uuid,
    pub title: String,
    pub amount: i64,
    pub amount_label: String,
    pub company_label: Option<String>,
    pub contact_label: Option<String>,
}

impl From<&Deal> for DealCard {
    fn from(deal: &Deal) -> Self {
        Self {
            id: deal.id,
            title: deal.title.clone(),
            amount: deal.amount,
            amount_label: format_amount(deal.amount),
            company_label: deal.company.as_ref().map(|company| company.name.clone()),
            contact_label: deal.contact.as_ref().map(|contact| contact.full_name()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub stage: Stage,
    pub title: &'static str,
    pub count: usize,
    pub total_amount: i64,
    pub cards: Vec<DealCard>,
}

impl BoardColumn {
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl From<&StageGroup> for BoardColumn {
    fn from(group: &StageGroup) -> Self {
        Self {
            stage: group.stage,
            title: group.stage.title(),
            count: group.deals.len(),
            total_amount: group.deals.iter().map(|deal| deal.amount).sum(),
            cards: group.deals.iter().map(DealCard::from).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub columns: Vec<BoardColumn>,
    pub overlay: Option<DealCard>,
    pub loading: bool,
}

impl BoardView {
    pub fn project(groups: &StageGroups, active: Option<&Deal>, loading: bool) -> Self {
        Self {
            columns: groups.iter().map(BoardColumn::from).collect(),
            overlay: active.map(DealCard::from),
            loading,
        }
    }

    pub fn column(&self, stage: Stage) -> Option<&BoardColumn> {
        self.columns.iter().find(|column| column.stage == stage)
    }
}

/// Whole-dollar label with thousands separators, e.g. `$1,234`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deal::{CompanyRef, ContactRef},
        partition::partition_all,
    };

    #[test]
    fn amounts_get_thousands_separators() {
        assert_eq!(format_amount(0), "$0");
        assert_eq!(format_amount(999), "$999");
        assert_eq!(format_amount(1_234), "$1,234");
        assert_eq!(format_amount(50_000), "$50,000");
        assert_eq!(format_amount(1_250_000), "$1,250,000");
        assert_eq!(format_amount(-4_500), "-$4,500");
    }

    #[test]
    fn projection_keeps_column_order_and_totals() {
        let deals = vec![
            Deal {
                id: Uuid::new_v4(),
                title: "Enterprise Software License".into(),
                amount: 50_000,
                stage: Stage::Qualified,
                company: Some(CompanyRef {
                    name: "Acme Corporation".into(),
                }),
                contact: Some(ContactRef {
                    first_name: "John".into(),
                    last_name: "Smith".into(),
                }),
            },
            Deal {
                id: Uuid::new_v4(),
                title: "Cloud Migration".into(),
                amount: 75_000,
                stage: Stage::Qualified,
                company: None,
                contact: None,
            },
        ];
        let view = BoardView::project(&partition_all(&deals), Some(&deals[1]), false);

        let stages: Vec<_> = view.columns.iter().map(|column| column.stage).collect();
        assert_eq!(stages, Stage::ALL.to_vec());
        let qualified = view.column(Stage::Qualified).unwrap();
        assert_eq!(qualified.count, 2);
        assert_eq!(qualified.total_amount, 125_000);
        assert_eq!(qualified.cards[0].company_label.as_deref(), Some("Acme Corporation"));
        assert_eq!(qualified.cards[0].contact_label.as_deref(), Some("John Smith"));
        assert_eq!(qualified.cards[0].amount_label, "$50,000");
        assert!(view.column(Stage::Lead).unwrap().is_empty());
        assert_eq!(view.overlay.as_ref().map(|card| card.id), Some(deals[1].id));
    }
}

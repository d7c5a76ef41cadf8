use serde::Serialize;

use crate::{deal::Deal, stage::Stage};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StageTotal {
    pub stage: Stage,
    pub count: usize,
    pub value: i64,
}

/// Aggregate figures over a set of deals.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealStats {
    pub total_deals: usize,
    pub total_value: i64,
    pub by_stage: Vec<StageTotal>,
    pub closed_won_value: i64,
    /// Value still open, i.e. not closed won or lost.
    pub pipeline_value: i64,
}

impl DealStats {
    pub fn compute(deals: &[Deal]) -> Self {
        let by_stage: Vec<StageTotal> = Stage::ALL
            .iter()
            .map(|&stage| {
                let (count, value) = deals
                    .iter()
                    .filter(|deal| deal.stage == stage)
                    .fold((0, 0), |(count, value), deal| (count + 1, value + deal.amount));
                StageTotal {
                    stage,
                    count,
                    value,
                }
            })
            .collect();
        let closed_won_value = by_stage
            .iter()
            .find(|total| total.stage == Stage::ClosedWon)
            .map_or(0, |total| total.value);
        let pipeline_value = by_stage
            .iter()
            .filter(|total| !total.stage.is_closed())
            .map(|total| total.value)
            .sum();
        Self {
            total_deals: deals.len(),
            total_value: deals.iter().map(|deal| deal.amount).sum(),
            by_stage,
            closed_won_value,
            pipeline_value,
        }
    }

    pub fn stage(&self, stage: Stage) -> StageTotal {
        self.by_stage
            .iter()
            .copied()
            .find(|total| total.stage == stage)
            .unwrap_or(StageTotal {
                stage,
                count: 0,
                value: 0,
            })
    }
}

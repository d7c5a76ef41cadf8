//! Groups a flat deal list into ordered stage columns.

use crate::{deal::Deal, stage::Stage};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StageGroup {
    pub stage: Stage,
    pub deals: Vec<Deal>,
}

/// Derived per-stage view of a deal list. Recomputed on every change.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StageGroups {
    groups: Vec<StageGroup>,
}

impl StageGroups {
    pub fn get(&self, stage: Stage) -> Option<&[Deal]> {
        self.groups
            .iter()
            .find(|group| group.stage == stage)
            .map(|group| group.deals.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageGroup> {
        self.groups.iter()
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.groups.iter().map(|group| group.stage)
    }

    /// Number of deals across every group.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.deals.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for StageGroups {
    type Item = StageGroup;
    type IntoIter = std::vec::IntoIter<StageGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Partition `deals` into one group per entry of `stages`, keeping input
/// order inside each group. Deals whose stage is not listed land nowhere.
/// A stage listed twice keeps its first position only.
pub fn partition(deals: &[Deal], stages: &[Stage]) -> StageGroups {
    let mut slots = [None::<usize>; Stage::COUNT];
    let mut groups: Vec<StageGroup> = Vec::with_capacity(stages.len());
    for &stage in stages {
        let slot = &mut slots[stage as usize];
        if slot.is_none() {
            *slot = Some(groups.len());
            groups.push(StageGroup {
                stage,
                deals: Vec::new(),
            });
        }
    }
    for deal in deals {
        if let Some(index) = slots[deal.stage as usize] {
            groups[index].deals.push(deal.clone());
        }
    }
    StageGroups { groups }
}

/// Partition over the full pipeline.
pub fn partition_all(deals: &[Deal]) -> StageGroups {
    partition(deals, &Stage::ALL)
}

//! The board's single source of truth: the flat deal list plus the
//! bookkeeping needed to undo optimistic stage writes.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{deal::Deal, stage::Stage};

/// Pre-mutation state captured by [`DealList::set_optimistic`].
#[derive(Debug)]
pub struct Snapshot {
    move_id: u64,
    deal_id: Uuid,
    previous: Stage,
    target: Stage,
    revision: u64,
    generation: u64,
    deals: Vec<Deal>,
}

impl Snapshot {
    pub fn deal_id(&self) -> Uuid {
        self.deal_id
    }

    pub fn previous_stage(&self) -> Stage {
        self.previous
    }

    pub fn target_stage(&self) -> Stage {
        self.target
    }

    /// List contents immediately before the optimistic write.
    pub fn deals(&self) -> &[Deal] {
        &self.deals
    }
}

/// What a failed confirmation did to the list.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rollback {
    /// Nothing changed since the write: the snapshot was restored verbatim.
    Restored,
    /// Other writes landed since: only this deal's stage was put back.
    Reverted,
    /// A later move of the same deal, or a refresh, owns the deal now.
    Superseded,
}

/// Outstanding moves of one deal, oldest first, over the last stage the
/// store accepted (or the stage the deal had before its first move).
#[derive(Clone, Debug)]
struct DealMoves {
    base_move: u64,
    base: Stage,
    pending: Vec<(u64, Stage)>,
}

impl DealMoves {
    /// Stage the deal should show with the outstanding moves applied.
    fn visible_stage(&self) -> Stage {
        match self.pending.last() {
            Some(&(move_id, target)) if move_id > self.base_move => target,
            _ => self.base,
        }
    }

    fn is_newest(&self, move_id: u64) -> bool {
        move_id > self.base_move && self.pending.last().is_some_and(|&(id, _)| id == move_id)
    }
}

#[derive(Debug, Default)]
pub struct DealList {
    deals: Vec<Deal>,
    revision: u64,
    generation: u64,
    next_move: u64,
    moves: HashMap<Uuid, DealMoves>,
}

impl DealList {
    pub fn new(deals: Vec<Deal>) -> Self {
        Self {
            deals,
            ..Self::default()
        }
    }

    pub fn get(&self) -> &[Deal] {
        &self.deals
    }

    pub fn find(&self, id: Uuid) -> Option<&Deal> {
        self.deals.iter().find(|deal| deal.id == id)
    }

    pub fn len(&self) -> usize {
        self.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deals.is_empty()
    }

    /// Number of optimistic writes still waiting on a confirmation.
    pub fn pending_count(&self) -> usize {
        self.moves.values().map(|moves| moves.pending.len()).sum()
    }

    /// Swap in a freshly fetched list. Outstanding snapshots no longer apply.
    pub fn replace(&mut self, deals: Vec<Deal>) {
        self.deals = deals;
        self.generation += 1;
        self.revision += 1;
        self.moves.clear();
    }

    /// Write `stage` onto deal `id`, returning what is needed to undo it.
    /// `None` when the deal is not in the list.
    pub fn set_optimistic(&mut self, id: Uuid, stage: Stage) -> Option<Snapshot> {
        let index = self.deals.iter().position(|deal| deal.id == id)?;
        let before = self.deals.clone();
        let previous = self.deals[index].stage;
        self.deals[index].stage = stage;
        self.revision += 1;
        self.next_move += 1;
        let move_id = self.next_move;
        self.moves
            .entry(id)
            .or_insert_with(|| DealMoves {
                base_move: 0,
                base: previous,
                pending: Vec::new(),
            })
            .pending
            .push((move_id, stage));
        Some(Snapshot {
            move_id,
            deal_id: id,
            previous,
            target: stage,
            revision: self.revision,
            generation: self.generation,
            deals: before,
        })
    }

    /// Mark the write behind `snapshot` as accepted by the store.
    pub fn confirm(&mut self, snapshot: &Snapshot) {
        if snapshot.generation != self.generation {
            return;
        }
        let Some(moves) = self.moves.get_mut(&snapshot.deal_id) else {
            return;
        };
        moves.pending.retain(|&(id, _)| id != snapshot.move_id);
        if snapshot.move_id > moves.base_move {
            moves.base_move = snapshot.move_id;
            moves.base = snapshot.target;
        }
        if moves.pending.is_empty() {
            self.moves.remove(&snapshot.deal_id);
        }
    }

    /// Undo the write behind `snapshot` after the store refused it.
    ///
    /// Only the newest move of a deal decides what the deal shows; once it
    /// fails the deal falls back to the newest move still outstanding, or to
    /// the last accepted stage when none is.
    pub fn rollback(&mut self, snapshot: Snapshot) -> Rollback {
        if snapshot.generation != self.generation {
            return Rollback::Superseded;
        }
        let Some(moves) = self.moves.get_mut(&snapshot.deal_id) else {
            return Rollback::Superseded;
        };
        let Some(position) = moves
            .pending
            .iter()
            .position(|&(id, _)| id == snapshot.move_id)
        else {
            return Rollback::Superseded;
        };
        let newest = moves.is_newest(snapshot.move_id);
        moves.pending.remove(position);
        let fallback = moves.visible_stage();
        if moves.pending.is_empty() {
            self.moves.remove(&snapshot.deal_id);
        }
        if !newest {
            return Rollback::Superseded;
        }
        let untouched = self.revision == snapshot.revision;
        self.revision += 1;
        if untouched && fallback == snapshot.previous {
            self.deals = snapshot.deals;
            return Rollback::Restored;
        }
        if let Some(deal) = self.deals.iter_mut().find(|deal| deal.id == snapshot.deal_id) {
            deal.stage = fallback;
        }
        Rollback::Reverted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(stage: Stage) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            title: format!("{} deal", stage.title()),
            amount: 250,
            stage,
            company: None,
            contact: None,
        }
    }

    fn stage_of(list: &DealList, id: Uuid) -> Stage {
        list.find(id).unwrap().stage
    }

    #[test]
    fn optimistic_write_is_visible_and_snapshot_holds_the_old_list() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::Qualified);
        let mut list = DealList::new(vec![a.clone(), b.clone()]);
        let snapshot = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        assert_eq!(stage_of(&list, a.id), Stage::Qualified);
        assert_eq!(snapshot.deals(), &[a, b][..]);
        assert_eq!(snapshot.previous_stage(), Stage::Lead);
        assert_eq!(list.pending_count(), 1);
    }

    #[test]
    fn unknown_id_is_not_written() {
        let mut list = DealList::new(vec![deal(Stage::Lead)]);
        assert!(list.set_optimistic(Uuid::new_v4(), Stage::ClosedWon).is_none());
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn rollback_without_interleaving_restores_the_snapshot() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::Negotiation);
        let original = vec![a.clone(), b];
        let mut list = DealList::new(original.clone());
        let snapshot = list.set_optimistic(a.id, Stage::ClosedLost).unwrap();
        assert_eq!(list.rollback(snapshot), Rollback::Restored);
        assert_eq!(list.get(), &original[..]);
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn rollback_after_other_writes_only_touches_its_deal() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::Lead);
        let mut list = DealList::new(vec![a.clone(), b.clone()]);
        let first = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let second = list.set_optimistic(b.id, Stage::ClosedWon).unwrap();
        assert_eq!(list.rollback(first), Rollback::Reverted);
        assert_eq!(stage_of(&list, a.id), Stage::Lead);
        assert_eq!(stage_of(&list, b.id), Stage::ClosedWon);
        list.confirm(&second);
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn superseded_failure_leaves_the_newer_move_alone() {
        let a = deal(Stage::Lead);
        let mut list = DealList::new(vec![a.clone()]);
        let first = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let second = list.set_optimistic(a.id, Stage::Negotiation).unwrap();
        assert_eq!(list.rollback(first), Rollback::Superseded);
        assert_eq!(stage_of(&list, a.id), Stage::Negotiation);
        assert_eq!(list.rollback(second), Rollback::Reverted);
        assert_eq!(stage_of(&list, a.id), Stage::Lead);
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn newer_failure_first_then_older_failure_returns_to_the_start() {
        let a = deal(Stage::Lead);
        let mut list = DealList::new(vec![a.clone()]);
        let first = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let second = list.set_optimistic(a.id, Stage::Negotiation).unwrap();
        assert_eq!(list.rollback(second), Rollback::Restored);
        assert_eq!(stage_of(&list, a.id), Stage::Qualified);
        assert_eq!(list.pending_count(), 1);
        assert_eq!(list.rollback(first), Rollback::Reverted);
        assert_eq!(stage_of(&list, a.id), Stage::Lead);
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn newer_failure_falls_back_to_an_accepted_older_move() {
        let a = deal(Stage::Lead);
        let mut list = DealList::new(vec![a.clone()]);
        let first = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let second = list.set_optimistic(a.id, Stage::Negotiation).unwrap();
        list.confirm(&first);
        assert_eq!(list.rollback(second), Rollback::Restored);
        assert_eq!(stage_of(&list, a.id), Stage::Qualified);
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn three_moves_failing_newest_first_unwind_in_order() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::ClosedLost);
        let mut list = DealList::new(vec![a.clone(), b.clone()]);
        let first = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let second = list.set_optimistic(a.id, Stage::Negotiation).unwrap();
        let other = list.set_optimistic(b.id, Stage::Lead).unwrap();
        let third = list.set_optimistic(a.id, Stage::ClosedWon).unwrap();

        assert_eq!(list.rollback(third), Rollback::Restored);
        assert_eq!(stage_of(&list, a.id), Stage::Negotiation);
        assert_eq!(list.rollback(second), Rollback::Reverted);
        assert_eq!(stage_of(&list, a.id), Stage::Qualified);
        assert_eq!(stage_of(&list, b.id), Stage::Lead);
        assert_eq!(list.rollback(first), Rollback::Reverted);
        assert_eq!(stage_of(&list, a.id), Stage::Lead);
        list.confirm(&other);
        assert_eq!(list.pending_count(), 0);
    }

    #[test]
    fn failure_after_a_newer_confirmation_is_ignored() {
        let a = deal(Stage::Lead);
        let mut list = DealList::new(vec![a.clone()]);
        let first = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let second = list.set_optimistic(a.id, Stage::ClosedWon).unwrap();
        list.confirm(&second);
        assert_eq!(list.rollback(first), Rollback::Superseded);
        assert_eq!(stage_of(&list, a.id), Stage::ClosedWon);
    }

    #[test]
    fn refresh_supersedes_outstanding_snapshots() {
        let a = deal(Stage::Lead);
        let mut list = DealList::new(vec![a.clone()]);
        let snapshot = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let mut fetched = a.clone();
        fetched.stage = Stage::Negotiation;
        list.replace(vec![fetched]);
        assert_eq!(list.rollback(snapshot), Rollback::Superseded);
        assert_eq!(stage_of(&list, a.id), Stage::Negotiation);
    }

    #[test]
    fn stale_confirmation_keeps_newer_pending_entry() {
        let a = deal(Stage::Lead);
        let mut list = DealList::new(vec![a.clone()]);
        let first = list.set_optimistic(a.id, Stage::Qualified).unwrap();
        let _second = list.set_optimistic(a.id, Stage::Negotiation).unwrap();
        list.confirm(&first);
        assert_eq!(list.pending_count(), 1);
    }
}

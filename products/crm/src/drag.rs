//! Drag lifecycle of the pipeline board.
//!
//! A gesture moves the controller `Idle -> Dragging`; the drop clears the
//! active deal immediately and, when the card lands on a different stage,
//! writes the new stage optimistically and hands back a [`PendingMove`]. The
//! caller confirms the move against the store and feeds the result to
//! [`DragController::resolve`]. Several moves may be in flight at once.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    deal::Deal,
    list::{DealList, Rollback, Snapshot},
    stage::Stage,
    store::StoreError,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { active: Uuid },
}

/// Identifier the pointer was over when the gesture ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DropTarget {
    Stage(Stage),
    Deal(Uuid),
}

impl DropTarget {
    /// Stage keys win over deal ids; anything else is not a target.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(stage) = Stage::from_key(raw) {
            return Some(DropTarget::Stage(stage));
        }
        Uuid::parse_str(raw).ok().map(DropTarget::Deal)
    }
}

/// Ticket for an optimistic write awaiting confirmation.
#[derive(Debug)]
#[must_use = "a pending move has to be resolved or its rollback is lost"]
pub struct PendingMove {
    snapshot: Snapshot,
}

impl PendingMove {
    pub fn deal_id(&self) -> Uuid {
        self.snapshot.deal_id()
    }

    pub fn from_stage(&self) -> Stage {
        self.snapshot.previous_stage()
    }

    pub fn to_stage(&self) -> Stage {
        self.snapshot.target_stage()
    }
}

#[derive(Debug)]
pub enum DropOutcome {
    /// No usable target; nothing changed.
    Discarded,
    /// Dropped onto the stage it already occupies; no write issued.
    Unchanged,
    /// Stage written locally; confirmation outstanding.
    Pending(PendingMove),
}

impl DropOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, DropOutcome::Pending(_))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Reconciliation {
    /// Store accepted the write; the optimistic state stands.
    Applied,
    /// Store refused; the pre-drag list was restored.
    RolledBack,
    /// Store refused; only the dragged deal's stage was put back.
    Reverted,
    /// Store refused, but a newer move or a refresh already owns the deal.
    Superseded,
}

impl From<Rollback> for Reconciliation {
    fn from(value: Rollback) -> Self {
        match value {
            Rollback::Restored => Reconciliation::RolledBack,
            Rollback::Reverted => Reconciliation::Reverted,
            Rollback::Superseded => Reconciliation::Superseded,
        }
    }
}

/// Outcome of a whole gesture, drop plus confirmation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DragOutcome {
    Discarded,
    Unchanged,
    Reconciled(Reconciliation),
}

#[derive(Debug)]
pub struct DragController {
    list: DealList,
    state: DragState,
}

impl DragController {
    pub fn new(deals: Vec<Deal>) -> Self {
        Self {
            list: DealList::new(deals),
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn deals(&self) -> &[Deal] {
        self.list.get()
    }

    pub fn list(&self) -> &DealList {
        &self.list
    }

    /// True while at least one optimistic write awaits confirmation.
    pub fn is_reconciling(&self) -> bool {
        self.list.pending_count() > 0
    }

    /// Deal to render in the drag overlay.
    pub fn active_deal(&self) -> Option<&Deal> {
        match self.state {
            DragState::Dragging { active } => self.list.find(active),
            DragState::Idle => None,
        }
    }

    /// Replace the list with freshly fetched deals.
    pub fn replace(&mut self, deals: Vec<Deal>) {
        self.list.replace(deals);
        if let DragState::Dragging { active } = self.state {
            if self.list.find(active).is_none() {
                self.state = DragState::Idle;
            }
        }
    }

    /// Begin dragging `id`. Unknown ids and a second start while a drag is
    /// active are ignored.
    pub fn start(&mut self, id: Uuid) -> Option<&Deal> {
        if let DragState::Dragging { active } = self.state {
            debug!(%active, ignored = %id, "drag already active");
            return None;
        }
        self.list.find(id)?;
        self.state = DragState::Dragging { active: id };
        debug!(deal_id = %id, "drag started");
        self.list.find(id)
    }

    /// Abandon the gesture without a target.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Stage a drop on `target` would move the dragged deal to.
    pub fn resolve_target(&self, target: &str) -> Option<Stage> {
        match DropTarget::parse(target)? {
            DropTarget::Stage(stage) => Some(stage),
            DropTarget::Deal(id) => self.list.find(id).map(|deal| deal.stage),
        }
    }

    /// End the gesture over `target` (`None` when dropped outside any target).
    pub fn drop_on(&mut self, target: Option<&str>) -> DropOutcome {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        let DragState::Dragging { active } = state else {
            return DropOutcome::Discarded;
        };
        let Some(stage) = target.and_then(|raw| self.resolve_target(raw)) else {
            debug!(deal_id = %active, ?target, "drop discarded");
            return DropOutcome::Discarded;
        };
        let Some(current) = self.list.find(active).map(|deal| deal.stage) else {
            return DropOutcome::Discarded;
        };
        if current == stage {
            return DropOutcome::Unchanged;
        }
        match self.list.set_optimistic(active, stage) {
            Some(snapshot) => {
                debug!(deal_id = %active, from = %current, to = %stage, "optimistic stage move");
                DropOutcome::Pending(PendingMove { snapshot })
            }
            None => DropOutcome::Discarded,
        }
    }

    /// Apply the store's answer for `pending`.
    pub fn resolve(
        &mut self,
        pending: PendingMove,
        result: Result<(), StoreError>,
    ) -> Reconciliation {
        let deal_id = pending.deal_id();
        match result {
            Ok(()) => {
                self.list.confirm(&pending.snapshot);
                debug!(%deal_id, stage = %pending.to_stage(), "stage move confirmed");
                Reconciliation::Applied
            }
            Err(err) => {
                let from = pending.from_stage();
                let outcome = Reconciliation::from(self.list.rollback(pending.snapshot));
                warn!(%deal_id, %from, error = %err, ?outcome, "stage move failed");
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(stage: Stage) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            title: format!("{} opportunity", stage.title()),
            amount: 5_000,
            stage,
            company: None,
            contact: None,
        }
    }

    fn pending(outcome: DropOutcome) -> PendingMove {
        match outcome {
            DropOutcome::Pending(pending) => pending,
            other => panic!("expected pending move, got {other:?}"),
        }
    }

    fn stage_of(controller: &DragController, id: Uuid) -> Stage {
        controller.list().find(id).unwrap().stage
    }

    fn rejected() -> Result<(), StoreError> {
        Err(StoreError::Rejected("nope".into()))
    }

    #[test]
    fn start_sets_the_overlay_deal() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone()]);
        assert_eq!(controller.start(a.id).map(|d| d.id), Some(a.id));
        assert_eq!(controller.state(), DragState::Dragging { active: a.id });
        assert_eq!(controller.active_deal().map(|d| d.id), Some(a.id));
    }

    #[test]
    fn start_with_unknown_id_stays_idle() {
        let mut controller = DragController::new(vec![deal(Stage::Lead)]);
        assert!(controller.start(Uuid::new_v4()).is_none());
        assert_eq!(controller.state(), DragState::Idle);
        assert!(controller.active_deal().is_none());
    }

    #[test]
    fn second_start_keeps_the_first_session() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::Qualified);
        let mut controller = DragController::new(vec![a.clone(), b.clone()]);
        controller.start(a.id);
        assert!(controller.start(b.id).is_none());
        assert_eq!(controller.state(), DragState::Dragging { active: a.id });
    }

    #[test]
    fn drop_on_stage_key_moves_optimistically() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::Qualified);
        let mut controller = DragController::new(vec![a.clone(), b.clone()]);
        controller.start(a.id);
        let pending = pending(controller.drop_on(Some("QUALIFIED")));
        assert_eq!(controller.state(), DragState::Idle);
        assert!(controller.active_deal().is_none());
        assert!(controller.is_reconciling());
        assert_eq!(stage_of(&controller, a.id), Stage::Qualified);
        assert_eq!(stage_of(&controller, b.id), Stage::Qualified);

        assert_eq!(controller.resolve(pending, Ok(())), Reconciliation::Applied);
        assert!(!controller.is_reconciling());
        assert_eq!(stage_of(&controller, a.id), Stage::Qualified);
    }

    #[test]
    fn failed_confirmation_rolls_back_everything() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::ClosedWon);
        let original = vec![a.clone(), b];
        let mut controller = DragController::new(original.clone());
        controller.start(a.id);
        let pending = pending(controller.drop_on(Some("QUALIFIED")));
        assert_eq!(stage_of(&controller, a.id), Stage::Qualified);
        assert_eq!(controller.resolve(pending, rejected()), Reconciliation::RolledBack);
        assert_eq!(controller.deals(), &original[..]);
    }

    #[test]
    fn drop_on_a_card_takes_that_cards_stage() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::Negotiation);
        let mut controller = DragController::new(vec![a.clone(), b.clone()]);
        controller.start(a.id);
        let pending = pending(controller.drop_on(Some(&b.id.to_string())));
        assert_eq!(pending.to_stage(), Stage::Negotiation);
        assert_eq!(pending.from_stage(), Stage::Lead);
        assert_eq!(stage_of(&controller, a.id), Stage::Negotiation);
    }

    #[test]
    fn self_drop_is_a_no_op() {
        let a = deal(Stage::Qualified);
        let b = deal(Stage::Qualified);
        let mut controller = DragController::new(vec![a.clone(), b.clone()]);
        controller.start(a.id);
        assert!(matches!(controller.drop_on(Some("QUALIFIED")), DropOutcome::Unchanged));
        controller.start(a.id);
        assert!(matches!(
            controller.drop_on(Some(&b.id.to_string())),
            DropOutcome::Unchanged
        ));
        controller.start(a.id);
        assert!(matches!(
            controller.drop_on(Some(&a.id.to_string())),
            DropOutcome::Unchanged
        ));
        assert!(!controller.is_reconciling());
        assert_eq!(controller.deals(), &[a, b][..]);
    }

    #[test]
    fn invalid_targets_are_discarded() {
        let a = deal(Stage::Lead);
        let original = vec![a.clone()];
        let mut controller = DragController::new(original.clone());
        for target in [None, Some("WON"), Some("qualified"), Some("not-a-deal")] {
            controller.start(a.id);
            assert!(matches!(controller.drop_on(target), DropOutcome::Discarded));
            assert_eq!(controller.state(), DragState::Idle);
        }
        controller.start(a.id);
        let missing = Uuid::new_v4().to_string();
        assert!(matches!(controller.drop_on(Some(&missing)), DropOutcome::Discarded));
        assert_eq!(controller.deals(), &original[..]);
    }

    #[test]
    fn drop_without_a_session_is_discarded() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a]);
        assert!(matches!(controller.drop_on(Some("CLOSED_WON")), DropOutcome::Discarded));
    }

    #[test]
    fn cancel_returns_to_idle() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone()]);
        controller.start(a.id);
        controller.cancel();
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn overlapping_moves_resolve_independently() {
        let a = deal(Stage::Lead);
        let b = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone(), b.clone()]);
        controller.start(a.id);
        let first = pending(controller.drop_on(Some("NEGOTIATION")));
        controller.start(b.id);
        let second = pending(controller.drop_on(Some("CLOSED_LOST")));

        assert_eq!(controller.resolve(second, Ok(())), Reconciliation::Applied);
        assert_eq!(controller.resolve(first, rejected()), Reconciliation::Reverted);
        assert_eq!(stage_of(&controller, a.id), Stage::Lead);
        assert_eq!(stage_of(&controller, b.id), Stage::ClosedLost);
    }

    #[test]
    fn later_move_of_the_same_deal_wins() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone()]);
        controller.start(a.id);
        let first = pending(controller.drop_on(Some("QUALIFIED")));
        controller.start(a.id);
        let second = pending(controller.drop_on(Some("CLOSED_WON")));

        assert_eq!(controller.resolve(first, rejected()), Reconciliation::Superseded);
        assert_eq!(stage_of(&controller, a.id), Stage::ClosedWon);
        assert_eq!(controller.resolve(second, Ok(())), Reconciliation::Applied);
        assert_eq!(stage_of(&controller, a.id), Stage::ClosedWon);
    }

    #[test]
    fn newer_rejection_first_then_older_rejection_returns_the_card() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone()]);
        controller.start(a.id);
        let first = pending(controller.drop_on(Some("QUALIFIED")));
        controller.start(a.id);
        let second = pending(controller.drop_on(Some("NEGOTIATION")));

        assert_eq!(controller.resolve(second, rejected()), Reconciliation::RolledBack);
        assert_eq!(stage_of(&controller, a.id), Stage::Qualified);
        assert!(controller.is_reconciling());
        assert_eq!(controller.resolve(first, rejected()), Reconciliation::Reverted);
        assert_eq!(stage_of(&controller, a.id), Stage::Lead);
        assert!(!controller.is_reconciling());
    }

    #[test]
    fn both_rejections_older_first_return_the_card() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone()]);
        controller.start(a.id);
        let first = pending(controller.drop_on(Some("QUALIFIED")));
        controller.start(a.id);
        let second = pending(controller.drop_on(Some("NEGOTIATION")));

        assert_eq!(controller.resolve(first, rejected()), Reconciliation::Superseded);
        assert_eq!(stage_of(&controller, a.id), Stage::Negotiation);
        assert_eq!(controller.resolve(second, rejected()), Reconciliation::Reverted);
        assert_eq!(stage_of(&controller, a.id), Stage::Lead);
        assert!(!controller.is_reconciling());
    }

    #[test]
    fn newer_rejection_keeps_an_accepted_older_move() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone()]);
        controller.start(a.id);
        let first = pending(controller.drop_on(Some("QUALIFIED")));
        controller.start(a.id);
        let second = pending(controller.drop_on(Some("NEGOTIATION")));

        assert_eq!(controller.resolve(first, Ok(())), Reconciliation::Applied);
        assert_eq!(controller.resolve(second, rejected()), Reconciliation::RolledBack);
        assert_eq!(stage_of(&controller, a.id), Stage::Qualified);
    }

    #[test]
    fn refresh_drops_a_vanished_active_deal() {
        let a = deal(Stage::Lead);
        let mut controller = DragController::new(vec![a.clone()]);
        controller.start(a.id);
        controller.replace(vec![deal(Stage::Qualified)]);
        assert_eq!(controller.state(), DragState::Idle);
    }

    #[test]
    fn drop_target_parsing_prefers_stage_keys() {
        assert_eq!(DropTarget::parse("CLOSED_LOST"), Some(DropTarget::Stage(Stage::ClosedLost)));
        let id = Uuid::new_v4();
        assert_eq!(DropTarget::parse(&id.to_string()), Some(DropTarget::Deal(id)));
        assert_eq!(DropTarget::parse(""), None);
    }
}

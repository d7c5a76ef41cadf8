//! The pipeline board: owner of the flat deal list, the search box and the
//! drag session, wired to a [`DealStore`].

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    deal::{Deal, ingest},
    drag::{DragController, DragOutcome, DropOutcome, PendingMove, Reconciliation},
    partition::{StageGroups, partition_all},
    search::filter_deals,
    store::{DealStore, StoreError, StoreResult},
    view::BoardView,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

pub struct DealBoard<S> {
    store: S,
    controller: DragController,
    search: String,
    load: LoadState,
}

impl<S: DealStore> DealBoard<S> {
    /// An empty board in the `Loading` state; call [`DealBoard::refresh`].
    pub fn new(store: S) -> Self {
        Self {
            store,
            controller: DragController::new(Vec::new()),
            search: String::new(),
            load: LoadState::Loading,
        }
    }

    /// Construct and load in one go.
    pub async fn load(store: S) -> StoreResult<Self> {
        let mut board = Self::new(store);
        board.refresh().await?;
        Ok(board)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn deals(&self) -> &[Deal] {
        self.controller.deals()
    }

    pub fn controller(&self) -> &DragController {
        &self.controller
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Fetch the full list. On failure the board holds no deals.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> StoreResult<()> {
        self.load = LoadState::Loading;
        match self.store.fetch_all().await {
            Ok(records) => {
                let deals = ingest(records);
                info!(count = deals.len(), "deal list loaded");
                self.controller.replace(deals);
                self.load = LoadState::Ready;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "deal list failed to load");
                self.controller.replace(Vec::new());
                self.load = LoadState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Visible deals grouped into the five columns.
    pub fn groups(&self) -> StageGroups {
        partition_all(&filter_deals(&self.search, self.controller.deals()))
    }

    pub fn view(&self) -> BoardView {
        BoardView::project(
            &self.groups(),
            self.controller.active_deal(),
            self.load == LoadState::Loading,
        )
    }

    pub fn drag_start(&mut self, id: Uuid) -> Option<&Deal> {
        self.controller.start(id)
    }

    pub fn drag_cancel(&mut self) {
        self.controller.cancel();
    }

    /// Finish the gesture locally. A `Pending` outcome must be confirmed.
    pub fn drag_end(&mut self, target: Option<&str>) -> DropOutcome {
        self.controller.drop_on(target)
    }

    /// Ask the store to persist `pending` and reconcile with its answer.
    pub async fn confirm(&mut self, pending: PendingMove) -> Reconciliation {
        let result = self
            .store
            .update_stage(pending.deal_id(), pending.to_stage())
            .await;
        self.controller.resolve(pending, result)
    }

    /// Reconcile a move whose store call the caller issued itself.
    pub fn resolve(
        &mut self,
        pending: PendingMove,
        result: Result<(), StoreError>,
    ) -> Reconciliation {
        self.controller.resolve(pending, result)
    }

    pub async fn drop_and_confirm(&mut self, target: Option<&str>) -> DragOutcome {
        match self.drag_end(target) {
            DropOutcome::Discarded => DragOutcome::Discarded,
            DropOutcome::Unchanged => DragOutcome::Unchanged,
            DropOutcome::Pending(pending) => DragOutcome::Reconciled(self.confirm(pending).await),
        }
    }
}

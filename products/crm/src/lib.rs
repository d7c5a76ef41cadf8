//! CRM deal pipeline: stage partitioning, search, drag-and-drop stage moves
//! with optimistic updates, and the stores that back them.

pub mod board;
pub mod client;
pub mod deal;
pub mod drag;
pub mod list;
pub mod partition;
pub mod persistence;
pub mod search;
pub mod seed;
pub mod stage;
pub mod stats;
pub mod store;
pub mod view;

pub use board::{DealBoard, LoadState};
pub use client::GraphqlDealStore;
pub use deal::{CompanyRef, ContactRef, Deal, DealRecord, RejectReason, ingest};
pub use drag::{
    DragController, DragOutcome, DragState, DropOutcome, DropTarget, PendingMove, Reconciliation,
};
pub use list::{DealList, Rollback, Snapshot};
pub use partition::{StageGroup, StageGroups, partition, partition_all};
pub use persistence::SeaOrmDealStore;
pub use search::{DealQuery, filter_deals};
pub use seed::{SeededCrmRecords, seed_crm_demo};
pub use stage::Stage;
pub use stats::{DealStats, StageTotal};
pub use store::{DealStore, MemoryDealStore, StageWrite, StoreError, StoreResult};
pub use view::{BoardColumn, BoardView, DealCard, format_amount};

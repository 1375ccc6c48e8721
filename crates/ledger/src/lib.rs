//! Layered ledger views.
//!
//! [`ChainStore`] holds committed state.  [`PendingState`] is a copy on write
//! overlay over any other view; overlays nest, and the delta they collect can
//! be pushed down into the parent or inverted into an undo delta.

mod delta;
mod ext;
mod pending;
mod store;
mod view;

pub use delta::StateDelta;
pub use ext::LedgerViewExt;
pub use pending::PendingState;
pub use store::ChainStore;
pub use view::LedgerView;

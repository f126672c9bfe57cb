//! View layer: the immutable [`ViewState`], its observable store, and the
//! render-ready projection handed to a presentation adapter.

pub mod display;
pub mod store;
pub mod view_state;

pub use display::{display_rows, DashboardView, DisplayRow, RankingTable, StatusBadge};
pub use store::{Listener, SubscriptionId, ViewStateStore};
pub use view_state::{ViewState, ViewUpdate};

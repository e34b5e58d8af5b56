//! Display-side view of aggregated progress.

mod service;
mod view;

pub use service::{DashboardService, DashboardSnapshot};
pub use view::{ParseViewError, SortKey, StatusFilter, present};

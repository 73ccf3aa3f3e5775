pub mod clock;
pub mod dday;
pub mod error;
pub mod model;
pub mod notifications;
pub mod prefs;
pub mod service;
pub mod store;

pub use crate::error::{PlannerError, StoreError};
pub use crate::service::{PlannerService, PlannerServiceBuilder};

//! Order lifecycle and subsidy engine.
//!
//! Placement snapshots a subsidized price, transitions run through the
//! data-driven table in [`lifecycle`] guarded by [`authorization`], and the
//! repository commits with compare-and-swap on the status the decision was
//! made against.

pub mod authorization;
pub mod domain;
pub mod import;
pub mod lifecycle;
pub(crate) mod locks;
pub mod memory;
pub mod pricing;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use authorization::{authorize, Authorization, DenialReason};
pub use domain::{
    Actor, CompanyId, LunchOption, LunchOptionId, Money, NewOrder, Order, OrderId, OrderStatus,
    Role, UserId,
};
pub use import::OrderImportError;
pub use lifecycle::{Capability, TransitionPlan, TransitionRule, TRANSITIONS};
pub use memory::{InMemoryMenu, InMemoryOrderRepository, InMemorySubsidies};
pub use pricing::{compute_subsidized_price, resolve_subsidy, PricingError, SubsidyConfig};
pub use report::DailyOrderReport;
pub use repository::{
    Insertion, MenuCatalog, OrderRepository, RepositoryError, SubsidyDirectory,
};
pub use router::order_router;
pub use service::{OrderLifecycleService, OrderServiceError};

use chrono::NaiveDate;

use super::domain::{
    CompanyId, LunchOption, LunchOptionId, Order, OrderId, OrderStatus, UserId,
};
use super::pricing::SubsidyConfig;

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Implementations must make `compare_and_swap` atomic: the status check and
/// the write happen under the same critical section of the backing store.
pub trait OrderRepository: Send + Sync {
    fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    fn find_by_user_and_date(
        &self,
        user_id: &UserId,
        company_id: &CompanyId,
        date: NaiveDate,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Store `order` only if its (user, company, date) slot is still free.
    ///
    /// The slot check and the write are one atomic step. An occupied slot is
    /// left untouched and its occupant returned. An id already used by a
    /// different slot fails with `DuplicateId` and nothing is written.
    fn insert_if_absent(&self, order: Order) -> Result<Insertion, RepositoryError>;

    /// Replace the stored order only if its status still equals `expected`.
    fn compare_and_swap(
        &self,
        expected: OrderStatus,
        order: Order,
    ) -> Result<Order, RepositoryError>;

    fn list_for_company_date(
        &self,
        company_id: &CompanyId,
        date: NaiveDate,
    ) -> Result<Vec<Order>, RepositoryError>;

    fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Order>, RepositoryError>;
}

/// Outcome of [`OrderRepository::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    Inserted(Order),
    Occupied(Order),
}

/// Read access to the provider menu.
pub trait MenuCatalog: Send + Sync {
    fn lunch_option(&self, id: &LunchOptionId) -> Result<Option<LunchOption>, RepositoryError>;
    fn lunch_options(&self) -> Result<Vec<LunchOption>, RepositoryError>;
}

/// Read access to subsidy settings. Each call returns a snapshot.
pub trait SubsidyDirectory: Send + Sync {
    fn company_subsidy(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<SubsidyConfig>, RepositoryError>;

    fn employee_subsidy(&self, user_id: &UserId) -> Result<Option<SubsidyConfig>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("order {order_id} not found")]
    NotFound { order_id: OrderId },
    #[error("order {order_id} is {actual}, expected {expected}")]
    Conflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },
    #[error("order id {order_id} is already in use")]
    DuplicateId { order_id: OrderId },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

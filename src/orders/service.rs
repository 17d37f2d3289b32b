use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::authorization::DenialReason;
use super::domain::{
    Actor, CompanyId, LunchOptionId, NewOrder, Order, OrderId, OrderStatus, Role, UserId,
};
use super::lifecycle::{plan_transition, TransitionPlan, INITIAL_STATUS};
use super::locks::{OrderLease, OrderLocks};
use super::pricing::{compute_subsidized_price, resolve_subsidy, PricingError};
use super::report::DailyOrderReport;
use super::repository::{
    Insertion, MenuCatalog, OrderRepository, RepositoryError, SubsidyDirectory,
};

/// Service composing the state machine, pricing policy, and repository ports.
pub struct OrderLifecycleService<R, M, S> {
    repository: Arc<R>,
    menu: Arc<M>,
    subsidies: Arc<S>,
    locks: OrderLocks,
}

static ORDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

const MAX_ID_ATTEMPTS: usize = 8;

fn next_order_id() -> OrderId {
    let id = ORDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OrderId(format!("ord-{id:06}"))
}

impl<R, M, S> OrderLifecycleService<R, M, S>
where
    R: OrderRepository + 'static,
    M: MenuCatalog + 'static,
    S: SubsidyDirectory + 'static,
{
    pub fn new(repository: Arc<R>, menu: Arc<M>, subsidies: Arc<S>) -> Self {
        Self::with_lock_wait(repository, menu, subsidies, Duration::from_millis(250))
    }

    pub fn with_lock_wait(
        repository: Arc<R>,
        menu: Arc<M>,
        subsidies: Arc<S>,
        lock_wait: Duration,
    ) -> Self {
        Self {
            repository,
            menu,
            subsidies,
            locks: OrderLocks::new(lock_wait),
        }
    }

    pub(crate) fn locks(&self) -> &OrderLocks {
        &self.locks
    }

    /// Place the daily order for `request.user_id`, or update the one already
    /// placed for that date.
    ///
    /// Prices are snapshotted from the current menu and subsidy settings. A
    /// free slot is claimed atomically; if another request claimed it first,
    /// that order is treated as the existing one. A pending order is re-priced
    /// in place; a rejected one is reopened. Orders already past review cannot
    /// be replaced.
    pub fn place_order(
        &self,
        request: NewOrder,
        actor: &Actor,
    ) -> Result<Order, OrderServiceError> {
        ensure_may_place(&request, actor)?;

        let option = self
            .menu
            .lunch_option(&request.lunch_option_id)?
            .ok_or_else(|| OrderServiceError::UnknownLunchOption(request.lunch_option_id.clone()))?;
        if !option.available {
            return Err(OrderServiceError::UnavailableLunchOption(option.id));
        }

        let company_subsidy = self.subsidies.company_subsidy(&request.company_id)?;
        let employee_subsidy = self.subsidies.employee_subsidy(&request.user_id)?;
        let subsidized_price = compute_subsidized_price(
            option.price,
            resolve_subsidy(company_subsidy.as_ref(), employee_subsidy.as_ref()),
        )?;

        let now = Utc::now();
        let found = self.repository.find_by_user_and_date(
            &request.user_id,
            &request.company_id,
            request.date,
        )?;

        let existing = match found {
            Some(existing) => existing,
            None => {
                let order = Order {
                    id: next_order_id(),
                    user_id: request.user_id.clone(),
                    company_id: request.company_id.clone(),
                    lunch_option_id: request.lunch_option_id.clone(),
                    date: request.date,
                    status: INITIAL_STATUS,
                    unit_price: option.price,
                    subsidized_price,
                    approved_by: None,
                    created_at: now,
                    updated_at: now,
                };
                match self.insert_new(order)? {
                    Insertion::Inserted(stored) => {
                        info!(
                            order_id = %stored.id,
                            user_id = %stored.user_id,
                            date = %stored.date,
                            unit_price = %stored.unit_price,
                            subsidized_price = %stored.subsidized_price,
                            "order placed"
                        );
                        return Ok(stored);
                    }
                    Insertion::Occupied(occupant) => {
                        debug!(order_id = %occupant.id, "slot filled concurrently; updating in place");
                        occupant
                    }
                }
            }
        };

        let _lease = self.lease(&existing.id)?;
        let current = self
            .repository
            .find_by_id(&existing.id)?
            .ok_or_else(|| OrderServiceError::NotFound {
                order_id: existing.id.clone(),
            })?;

        if !matches!(current.status, OrderStatus::Pending | OrderStatus::Rejected) {
            warn!(order_id = %current.id, status = %current.status, "order is past review; cannot replace");
            return Err(OrderServiceError::Denied(DenialReason::InvalidTransition {
                from: current.status,
                to: INITIAL_STATUS,
            }));
        }

        let mut replacement = current.clone();
        replacement.lunch_option_id = request.lunch_option_id;
        replacement.unit_price = option.price;
        replacement.subsidized_price = subsidized_price;
        replacement.status = INITIAL_STATUS;
        replacement.approved_by = None;
        replacement.updated_at = now;

        let stored = self
            .repository
            .compare_and_swap(current.status, replacement)?;
        info!(
            order_id = %stored.id,
            previous_status = %current.status,
            subsidized_price = %stored.subsidized_price,
            "order updated in place"
        );
        Ok(stored)
    }

    /// Move an order to `requested` on behalf of `actor`.
    ///
    /// Work on one order is serialized; the status read under the lease is the
    /// one the commit is conditioned on.
    pub fn transition(
        &self,
        order_id: &OrderId,
        requested: OrderStatus,
        actor: &Actor,
    ) -> Result<Order, OrderServiceError> {
        let _lease = self.lease(order_id)?;

        let current = self
            .repository
            .find_by_id(order_id)?
            .ok_or_else(|| OrderServiceError::NotFound {
                order_id: order_id.clone(),
            })?;

        match plan_transition(&current, requested, actor, Utc::now()) {
            Ok(TransitionPlan::Unchanged) => {
                debug!(order_id = %order_id, status = %current.status, "transition already applied");
                Ok(current)
            }
            Ok(TransitionPlan::Apply(next)) => {
                let stored = self.repository.compare_and_swap(current.status, next)?;
                info!(
                    order_id = %order_id,
                    from = %current.status,
                    to = %stored.status,
                    actor = %actor.user_id,
                    role = %actor.role,
                    "order transitioned"
                );
                Ok(stored)
            }
            Err(reason) => {
                warn!(
                    order_id = %order_id,
                    role = %actor.role,
                    kind = reason.kind(),
                    "transition denied: {reason}"
                );
                Err(OrderServiceError::Denied(reason))
            }
        }
    }

    pub fn get(&self, order_id: &OrderId) -> Result<Order, OrderServiceError> {
        self.repository
            .find_by_id(order_id)?
            .ok_or_else(|| OrderServiceError::NotFound {
                order_id: order_id.clone(),
            })
    }

    /// Dashboard aggregate for one date, optionally scoped to a company.
    pub fn daily_report(
        &self,
        date: NaiveDate,
        company_id: Option<&CompanyId>,
    ) -> Result<DailyOrderReport, OrderServiceError> {
        let orders = match company_id {
            Some(company_id) => self.repository.list_for_company_date(company_id, date)?,
            None => self.repository.list_for_date(date)?,
        };
        let options = self.menu.lunch_options()?;
        Ok(DailyOrderReport::from_orders(&orders, &options))
    }

    /// Insert a fresh order, drawing a new id whenever the store reports the
    /// drawn one as taken.
    fn insert_new(&self, mut order: Order) -> Result<Insertion, OrderServiceError> {
        for _ in 1..MAX_ID_ATTEMPTS {
            match self.repository.insert_if_absent(order.clone()) {
                Err(RepositoryError::DuplicateId { order_id }) => {
                    warn!(order_id = %order_id, "order id already in use; drawing another");
                    order.id = next_order_id();
                }
                outcome => return Ok(outcome?),
            }
        }
        Ok(self.repository.insert_if_absent(order)?)
    }

    fn lease(&self, order_id: &OrderId) -> Result<OrderLease<'_>, OrderServiceError> {
        self.locks.acquire(order_id).map_err(|timeout| {
            warn!(order_id = %order_id, waited_ms = timeout.waited.as_millis() as u64, "order busy");
            OrderServiceError::Busy {
                order_id: order_id.clone(),
            }
        })
    }
}

/// Employees order for themselves; supervisors and company accounts within
/// their company; providers and admins for anyone.
fn ensure_may_place(request: &NewOrder, actor: &Actor) -> Result<(), OrderServiceError> {
    let permitted = match actor.role {
        Role::Admin | Role::Provider => true,
        Role::Employee => actor.user_id == request.user_id,
        Role::Supervisor | Role::Company => {
            actor.company_id.as_ref() == Some(&request.company_id)
        }
    };

    if permitted {
        Ok(())
    } else {
        warn!(role = %actor.role, actor = %actor.user_id, user_id = %request.user_id, "order placement refused");
        Err(OrderServiceError::PlacementDenied {
            role: actor.role,
            user_id: request.user_id.clone(),
            company_id: request.company_id.clone(),
        })
    }
}

/// Error raised by the order service. Each variant carries its inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderServiceError {
    #[error("order {order_id} not found")]
    NotFound { order_id: OrderId },
    #[error(transparent)]
    Denied(#[from] DenialReason),
    #[error("order {order_id} changed concurrently (expected {expected}, found {actual}); re-read and retry")]
    Conflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },
    #[error("order {order_id} is busy; retry shortly")]
    Busy { order_id: OrderId },
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("lunch option {0} does not exist")]
    UnknownLunchOption(LunchOptionId),
    #[error("lunch option {0} is not available")]
    UnavailableLunchOption(LunchOptionId),
    #[error("role {role} may not place orders for {user_id} at {company_id}")]
    PlacementDenied {
        role: Role,
        user_id: UserId,
        company_id: CompanyId,
    },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl OrderServiceError {
    pub const fn kind(&self) -> &'static str {
        match self {
            OrderServiceError::NotFound { .. } => "not_found",
            OrderServiceError::Denied(reason) => reason.kind(),
            OrderServiceError::Conflict { .. } | OrderServiceError::Busy { .. } => "conflict",
            OrderServiceError::Pricing(_) => "invalid_configuration",
            OrderServiceError::UnknownLunchOption(_) => "unknown_lunch_option",
            OrderServiceError::UnavailableLunchOption(_) => "unavailable_lunch_option",
            OrderServiceError::PlacementDenied { .. } => "unauthorized",
            OrderServiceError::Repository(_) => "repository_unavailable",
        }
    }

    /// Only lost races and busy orders are worth retrying after a fresh read.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrderServiceError::Conflict { .. } | OrderServiceError::Busy { .. }
        )
    }
}

impl From<RepositoryError> for OrderServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { order_id } => Self::NotFound { order_id },
            RepositoryError::Conflict {
                order_id,
                expected,
                actual,
            } => Self::Conflict {
                order_id,
                expected,
                actual,
            },
            other => Self::Repository(other),
        }
    }
}

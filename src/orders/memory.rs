//! Process-local adapters for the repository ports, used by the HTTP service
//! and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use super::domain::{
    CompanyId, LunchOption, LunchOptionId, Order, OrderId, OrderStatus, UserId,
};
use super::pricing::SubsidyConfig;
use super::repository::{
    Insertion, MenuCatalog, OrderRepository, RepositoryError, SubsidyDirectory,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<Mutex<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let map = orders
            .into_iter()
            .map(|order| (order.id.clone(), order))
            .collect();
        Self {
            orders: Arc::new(Mutex::new(map)),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.orders).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(lock(&self.orders).get(id).cloned())
    }

    fn find_by_user_and_date(
        &self,
        user_id: &UserId,
        company_id: &CompanyId,
        date: NaiveDate,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(lock(&self.orders)
            .values()
            .find(|order| order.occupies(user_id, company_id, date))
            .cloned())
    }

    fn insert_if_absent(&self, order: Order) -> Result<Insertion, RepositoryError> {
        let mut guard = lock(&self.orders);
        if let Some(occupant) = guard
            .values()
            .find(|stored| stored.occupies(&order.user_id, &order.company_id, order.date))
        {
            return Ok(Insertion::Occupied(occupant.clone()));
        }
        if guard.contains_key(&order.id) {
            return Err(RepositoryError::DuplicateId { order_id: order.id });
        }

        guard.insert(order.id.clone(), order.clone());
        Ok(Insertion::Inserted(order))
    }

    fn compare_and_swap(
        &self,
        expected: OrderStatus,
        order: Order,
    ) -> Result<Order, RepositoryError> {
        let mut guard = lock(&self.orders);
        let stored = guard
            .get_mut(&order.id)
            .ok_or_else(|| RepositoryError::NotFound {
                order_id: order.id.clone(),
            })?;

        if stored.status != expected {
            return Err(RepositoryError::Conflict {
                order_id: order.id.clone(),
                expected,
                actual: stored.status,
            });
        }

        *stored = order.clone();
        Ok(order)
    }

    fn list_for_company_date(
        &self,
        company_id: &CompanyId,
        date: NaiveDate,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = lock(&self.orders)
            .values()
            .filter(|order| &order.company_id == company_id && order.date == date)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }

    fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = lock(&self.orders)
            .values()
            .filter(|order| order.date == date)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(orders)
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryMenu {
    options: Arc<Mutex<HashMap<LunchOptionId, LunchOption>>>,
}

impl InMemoryMenu {
    pub fn with_options(options: impl IntoIterator<Item = LunchOption>) -> Self {
        let menu = Self::default();
        for option in options {
            menu.put(option);
        }
        menu
    }

    pub fn put(&self, option: LunchOption) {
        lock(&self.options).insert(option.id.clone(), option);
    }
}

impl MenuCatalog for InMemoryMenu {
    fn lunch_option(&self, id: &LunchOptionId) -> Result<Option<LunchOption>, RepositoryError> {
        Ok(lock(&self.options).get(id).cloned())
    }

    fn lunch_options(&self) -> Result<Vec<LunchOption>, RepositoryError> {
        let mut options: Vec<LunchOption> = lock(&self.options).values().cloned().collect();
        options.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(options)
    }
}

/// Subsidy settings keyed by company with optional per-employee overrides.
#[derive(Debug, Default, Clone)]
pub struct InMemorySubsidies {
    companies: Arc<Mutex<HashMap<CompanyId, SubsidyConfig>>>,
    employees: Arc<Mutex<HashMap<UserId, SubsidyConfig>>>,
}

impl InMemorySubsidies {
    pub fn set_company(&self, company_id: CompanyId, config: SubsidyConfig) {
        lock(&self.companies).insert(company_id, config);
    }

    pub fn set_employee(&self, user_id: UserId, config: SubsidyConfig) {
        lock(&self.employees).insert(user_id, config);
    }

    pub fn clear_employee(&self, user_id: &UserId) {
        lock(&self.employees).remove(user_id);
    }
}

impl SubsidyDirectory for InMemorySubsidies {
    fn company_subsidy(
        &self,
        company_id: &CompanyId,
    ) -> Result<Option<SubsidyConfig>, RepositoryError> {
        Ok(lock(&self.companies).get(company_id).copied())
    }

    fn employee_subsidy(&self, user_id: &UserId) -> Result<Option<SubsidyConfig>, RepositoryError> {
        Ok(lock(&self.employees).get(user_id).copied())
    }
}

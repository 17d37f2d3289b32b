use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::orders::domain::{
    Actor, CompanyId, LunchOption, LunchOptionId, Money, NewOrder, Order, OrderId, OrderStatus,
    Role, UserId,
};
use crate::orders::memory::{InMemoryMenu, InMemoryOrderRepository, InMemorySubsidies};
use crate::orders::pricing::SubsidyConfig;
use crate::orders::repository::{Insertion, OrderRepository, RepositoryError};
use crate::orders::service::OrderLifecycleService;

pub(super) type MemoryService =
    OrderLifecycleService<InMemoryOrderRepository, InMemoryMenu, InMemorySubsidies>;

pub(super) const COMPANY: &str = "acme";

pub(super) fn money(raw: &str) -> Money {
    raw.parse().expect("valid money literal")
}

pub(super) fn lunch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date")
}

pub(super) fn menu() -> InMemoryMenu {
    InMemoryMenu::with_options([
        LunchOption {
            id: LunchOptionId("veg-bowl".to_string()),
            name: "Veggie Bowl".to_string(),
            price: money("12.00"),
            available: true,
        },
        LunchOption {
            id: LunchOptionId("salmon".to_string()),
            name: "Grilled Salmon".to_string(),
            price: money("20.00"),
            available: true,
        },
        LunchOption {
            id: LunchOptionId("soup".to_string()),
            name: "Soup of the Day".to_string(),
            price: money("6.50"),
            available: false,
        },
    ])
}

pub(super) fn thirty_percent() -> SubsidyConfig {
    SubsidyConfig::Percentage {
        percentage_value: 30.0,
    }
}

pub(super) struct Harness {
    pub(super) service: MemoryService,
    pub(super) repository: Arc<InMemoryOrderRepository>,
    pub(super) subsidies: Arc<InMemorySubsidies>,
}

pub(super) fn harness() -> Harness {
    harness_with_wait(Duration::from_millis(250))
}

pub(super) fn harness_with_wait(lock_wait: Duration) -> Harness {
    let repository = Arc::new(InMemoryOrderRepository::default());
    let subsidies = Arc::new(InMemorySubsidies::default());
    subsidies.set_company(CompanyId(COMPANY.to_string()), thirty_percent());
    let service = OrderLifecycleService::with_lock_wait(
        repository.clone(),
        Arc::new(menu()),
        subsidies.clone(),
        lock_wait,
    );
    Harness {
        service,
        repository,
        subsidies,
    }
}

pub(super) fn actor(user: &str, role: Role) -> Actor {
    Actor {
        user_id: UserId(user.to_string()),
        role,
        company_id: Some(CompanyId(COMPANY.to_string())),
    }
}

pub(super) fn employee(user: &str) -> Actor {
    actor(user, Role::Employee)
}

pub(super) fn supervisor() -> Actor {
    actor("sup-1", Role::Supervisor)
}

pub(super) fn provider() -> Actor {
    Actor {
        user_id: UserId("chef-1".to_string()),
        role: Role::Provider,
        company_id: None,
    }
}

pub(super) fn admin() -> Actor {
    Actor {
        user_id: UserId("root".to_string()),
        role: Role::Admin,
        company_id: None,
    }
}

pub(super) fn new_order(user: &str, option: &str) -> NewOrder {
    NewOrder {
        user_id: UserId(user.to_string()),
        company_id: CompanyId(COMPANY.to_string()),
        lunch_option_id: LunchOptionId(option.to_string()),
        date: lunch_date(),
    }
}

pub(super) fn place(harness: &Harness, user: &str, option: &str) -> Order {
    harness
        .service
        .place_order(new_order(user, option), &employee(user))
        .expect("order placed")
}

/// Drive a freshly placed order to `status` along the happy path.
pub(super) fn order_in_status(harness: &Harness, user: &str, status: OrderStatus) -> Order {
    let order = place(harness, user, "veg-bowl");
    let path: Vec<(OrderStatus, Actor)> = match status {
        OrderStatus::Pending => Vec::new(),
        OrderStatus::Approved => vec![(OrderStatus::Approved, supervisor())],
        OrderStatus::Rejected => vec![(OrderStatus::Rejected, supervisor())],
        OrderStatus::Prepared => vec![
            (OrderStatus::Approved, supervisor()),
            (OrderStatus::Prepared, provider()),
        ],
        OrderStatus::Delivered => vec![
            (OrderStatus::Approved, supervisor()),
            (OrderStatus::Prepared, provider()),
            (OrderStatus::Delivered, provider()),
        ],
    };

    path.into_iter().fold(order, |order, (next, actor)| {
        harness
            .service
            .transition(&order.id, next, &actor)
            .expect("happy path transition")
    })
}

/// Repository that is always offline.
pub(super) struct UnavailableRepository;

impl OrderRepository for UnavailableRepository {
    fn find_by_id(&self, _id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_user_and_date(
        &self,
        _user_id: &UserId,
        _company_id: &CompanyId,
        _date: NaiveDate,
    ) -> Result<Option<Order>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_if_absent(&self, _order: Order) -> Result<Insertion, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn compare_and_swap(
        &self,
        _expected: OrderStatus,
        _order: Order,
    ) -> Result<Order, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_for_company_date(
        &self,
        _company_id: &CompanyId,
        _date: NaiveDate,
    ) -> Result<Vec<Order>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_for_date(&self, _date: NaiveDate) -> Result<Vec<Order>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

use chrono::NaiveDate;
use meal_orders::config::OrderingConfig;
use meal_orders::orders::{
    CompanyId, InMemoryMenu, InMemoryOrderRepository, InMemorySubsidies, LunchOption,
    LunchOptionId, Money, OrderLifecycleService, SubsidyConfig,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type MemoryOrderService =
    OrderLifecycleService<InMemoryOrderRepository, InMemoryMenu, InMemorySubsidies>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Menu served until a provider catalog is wired in.
pub(crate) fn seeded_menu() -> InMemoryMenu {
    let option = |id: &str, name: &str, cents: i64, available: bool| LunchOption {
        id: LunchOptionId(id.to_string()),
        name: name.to_string(),
        price: Money::from_cents(cents),
        available,
    };

    InMemoryMenu::with_options([
        option("veg-bowl", "Veggie Bowl", 1200, true),
        option("salmon", "Grilled Salmon", 2000, true),
        option("chicken-wrap", "Chicken Wrap", 950, true),
        option("soup", "Soup of the Day", 650, false),
    ])
}

pub(crate) fn seeded_subsidies() -> InMemorySubsidies {
    let subsidies = InMemorySubsidies::default();
    subsidies.set_company(
        CompanyId("acme".to_string()),
        SubsidyConfig::Percentage {
            percentage_value: 30.0,
        },
    );
    subsidies.set_company(
        CompanyId("globex".to_string()),
        SubsidyConfig::Fixed {
            fixed_value: Money::from_cents(500),
        },
    );
    subsidies
}

pub(crate) fn in_memory_service(ordering: &OrderingConfig) -> MemoryOrderService {
    OrderLifecycleService::with_lock_wait(
        Arc::new(InMemoryOrderRepository::default()),
        Arc::new(seeded_menu()),
        Arc::new(seeded_subsidies()),
        ordering.lock_wait,
    )
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

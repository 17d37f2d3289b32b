use std::sync::Arc;

use super::common::*;
use crate::orders::authorization::DenialReason;
use crate::orders::domain::{CompanyId, LunchOptionId, OrderStatus, Role, UserId};
use crate::orders::memory::{InMemoryMenu, InMemorySubsidies};
use crate::orders::pricing::{PricingError, SubsidyConfig};
use crate::orders::repository::{OrderRepository, RepositoryError};
use crate::orders::service::{OrderLifecycleService, OrderServiceError};

#[test]
fn new_orders_start_pending_for_every_creator() {
    let harness = harness();
    let creators = [
        ("emp-1", employee("emp-1")),
        ("emp-2", supervisor()),
        ("emp-3", provider()),
        ("emp-4", admin()),
        ("emp-5", actor("acme-office", Role::Company)),
    ];

    for (user, creator) in creators {
        let order = harness
            .service
            .place_order(new_order(user, "salmon"), &creator)
            .expect("order placed");
        assert_eq!(order.status, OrderStatus::Pending, "created by {}", creator.role);
        assert_eq!(order.approved_by, None);
        assert_eq!(order.created_at, order.updated_at);
    }
    assert_eq!(harness.repository.len(), 5);
}

#[test]
fn employee_override_replaces_company_subsidy() {
    let harness = harness();
    harness.subsidies.set_employee(
        UserId("emp-1".to_string()),
        SubsidyConfig::Fixed {
            fixed_value: money("25.00"),
        },
    );

    let overridden = place(&harness, "emp-1", "salmon");
    assert_eq!(overridden.unit_price, money("20.00"));
    assert_eq!(overridden.subsidized_price, money("0.00"));

    let company_rule = place(&harness, "emp-2", "salmon");
    assert_eq!(company_rule.subsidized_price, money("14.00"));
}

#[test]
fn no_subsidy_charges_list_price() {
    let repository = Arc::new(crate::orders::memory::InMemoryOrderRepository::default());
    let service = OrderLifecycleService::new(
        repository,
        Arc::new(menu()),
        Arc::new(InMemorySubsidies::default()),
    );
    let order = service
        .place_order(new_order("emp-1", "salmon"), &employee("emp-1"))
        .expect("order placed");
    assert_eq!(order.subsidized_price, money("20.00"));
}

#[test]
fn later_subsidy_changes_do_not_touch_existing_orders() {
    let harness = harness();
    let order = place(&harness, "emp-1", "veg-bowl");

    harness.subsidies.set_company(
        CompanyId(COMPANY.to_string()),
        SubsidyConfig::Percentage {
            percentage_value: 100.0,
        },
    );
    let approved = harness
        .service
        .transition(&order.id, OrderStatus::Approved, &supervisor())
        .expect("approve");

    assert_eq!(approved.subsidized_price, money("8.40"));
}

#[test]
fn second_placement_updates_the_pending_order_in_place() {
    let harness = harness();
    let first = place(&harness, "emp-1", "veg-bowl");
    let second = place(&harness, "emp-1", "salmon");

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.lunch_option_id, LunchOptionId("salmon".to_string()));
    assert_eq!(second.unit_price, money("20.00"));
    assert_eq!(second.subsidized_price, money("14.00"));
    assert_eq!(harness.repository.len(), 1);
}

#[test]
fn rejected_order_is_reopened_for_the_same_day() {
    let harness = harness();
    let rejected = order_in_status(&harness, "emp-1", OrderStatus::Rejected);
    assert!(rejected.approved_by.is_some());

    let reopened = place(&harness, "emp-1", "salmon");
    assert_eq!(reopened.id, rejected.id);
    assert_eq!(reopened.status, OrderStatus::Pending);
    assert_eq!(reopened.approved_by, None);
    assert_eq!(harness.repository.len(), 1);
}

#[test]
fn reviewed_orders_cannot_be_replaced() {
    for status in [
        OrderStatus::Approved,
        OrderStatus::Prepared,
        OrderStatus::Delivered,
    ] {
        let harness = harness();
        let order = order_in_status(&harness, "emp-1", status);

        let result = harness
            .service
            .place_order(new_order("emp-1", "salmon"), &employee("emp-1"));
        assert_eq!(
            result,
            Err(OrderServiceError::Denied(DenialReason::InvalidTransition {
                from: status,
                to: OrderStatus::Pending,
            }))
        );

        let stored = harness
            .repository
            .find_by_id(&order.id)
            .expect("fetch")
            .expect("present");
        assert_eq!(stored, order);
    }
}

#[test]
fn other_dates_get_their_own_order() {
    let harness = harness();
    let today = place(&harness, "emp-1", "veg-bowl");

    let mut tomorrow = new_order("emp-1", "veg-bowl");
    tomorrow.date = lunch_date().succ_opt().expect("next day");
    let next = harness
        .service
        .place_order(tomorrow, &employee("emp-1"))
        .expect("second day");

    assert_ne!(today.id, next.id);
    assert_eq!(harness.repository.len(), 2);
}

#[test]
fn employees_only_order_for_themselves() {
    let harness = harness();
    let result = harness
        .service
        .place_order(new_order("emp-2", "veg-bowl"), &employee("emp-1"));

    assert_eq!(
        result,
        Err(OrderServiceError::PlacementDenied {
            role: Role::Employee,
            user_id: UserId("emp-2".to_string()),
            company_id: CompanyId(COMPANY.to_string()),
        })
    );
    assert!(harness.repository.is_empty());
}

#[test]
fn supervisors_stay_within_their_company() {
    let harness = harness();
    let mut request = new_order("emp-9", "veg-bowl");
    request.company_id = CompanyId("globex".to_string());

    assert!(matches!(
        harness.service.place_order(request, &supervisor()),
        Err(OrderServiceError::PlacementDenied { .. })
    ));
}

#[test]
fn unknown_and_unavailable_options_are_rejected() {
    let harness = harness();

    assert_eq!(
        harness
            .service
            .place_order(new_order("emp-1", "pizza"), &employee("emp-1")),
        Err(OrderServiceError::UnknownLunchOption(LunchOptionId(
            "pizza".to_string()
        )))
    );
    assert_eq!(
        harness
            .service
            .place_order(new_order("emp-1", "soup"), &employee("emp-1")),
        Err(OrderServiceError::UnavailableLunchOption(LunchOptionId(
            "soup".to_string()
        )))
    );
}

#[test]
fn invalid_subsidy_configuration_is_surfaced() {
    let harness = harness();
    harness.subsidies.set_company(
        CompanyId(COMPANY.to_string()),
        SubsidyConfig::Percentage {
            percentage_value: 140.0,
        },
    );

    let err = harness
        .service
        .place_order(new_order("emp-1", "veg-bowl"), &employee("emp-1"))
        .expect_err("misconfigured subsidy");
    assert_eq!(
        err,
        OrderServiceError::Pricing(PricingError::PercentageOutOfRange { value: 140.0 })
    );
    assert_eq!(err.kind(), "invalid_configuration");
    assert!(harness.repository.is_empty());
}

#[test]
fn repository_outage_is_reported() {
    let service = OrderLifecycleService::new(
        Arc::new(UnavailableRepository),
        Arc::new(InMemoryMenu::default()),
        Arc::new(InMemorySubsidies::default()),
    );
    let order_id = crate::orders::domain::OrderId("ord-1".to_string());

    assert_eq!(
        service.get(&order_id),
        Err(OrderServiceError::Repository(RepositoryError::Unavailable(
            "database offline".to_string()
        )))
    );
}

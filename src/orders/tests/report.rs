use super::common::*;
use crate::orders::domain::{
    CompanyId, LunchOptionId, Money, NewOrder, OrderStatus, Role, UserId,
};
use crate::orders::report::DailyOrderReport;

#[test]
fn empty_day_reports_zeroes() {
    let report = DailyOrderReport::from_orders(&[], &[]);
    let summary = report.summary();

    assert_eq!(summary.order_count, 0);
    assert_eq!(summary.distinct_user_count, 0);
    assert!(summary.meal_counts.is_empty());
    assert!(summary.company_counts.is_empty());
    assert_eq!(summary.status_counts.len(), 5);
    assert!(summary.status_counts.iter().all(|entry| entry.count == 0));
    assert_eq!(summary.spend.average_paid, Money::ZERO);
    assert_eq!(summary.spend.subsidy_total, Money::ZERO);
}

#[test]
fn report_tallies_statuses_meals_and_users() {
    let harness = harness();
    order_in_status(&harness, "emp-1", OrderStatus::Delivered);
    order_in_status(&harness, "emp-2", OrderStatus::Approved);
    place(&harness, "emp-3", "salmon");
    order_in_status(&harness, "emp-4", OrderStatus::Rejected);

    let report = harness
        .service
        .daily_report(lunch_date(), Some(&CompanyId(COMPANY.to_string())))
        .expect("report");

    assert_eq!(report.order_count, 4);
    assert_eq!(report.distinct_user_count, 4);
    assert_eq!(report.count(OrderStatus::Delivered), 1);
    assert_eq!(report.count(OrderStatus::Approved), 1);
    assert_eq!(report.count(OrderStatus::Pending), 1);
    assert_eq!(report.count(OrderStatus::Rejected), 1);
    assert_eq!(report.count(OrderStatus::Prepared), 0);

    let summary = report.summary();
    let meals: Vec<(&str, usize)> = summary
        .meal_counts
        .iter()
        .map(|entry| (entry.name.as_str(), entry.count))
        .collect();
    assert_eq!(meals, vec![("Veggie Bowl", 3), ("Grilled Salmon", 1)]);

    // 3 x 12.00 + 20.00 listed; 3 x 8.40 + 14.00 paid
    assert_eq!(summary.spend.list_total, money("56.00"));
    assert_eq!(summary.spend.paid_total, money("39.20"));
    assert_eq!(summary.spend.subsidy_total, money("16.80"));
    assert_eq!(summary.spend.average_paid, money("9.80"));
}

#[test]
fn provider_view_counts_orders_per_company() {
    let harness = harness();
    place(&harness, "emp-1", "veg-bowl");
    place(&harness, "emp-2", "veg-bowl");
    harness
        .service
        .place_order(
            NewOrder {
                user_id: UserId("g-1".to_string()),
                company_id: CompanyId("globex".to_string()),
                lunch_option_id: LunchOptionId("salmon".to_string()),
                date: lunch_date(),
            },
            &actor("chef-1", Role::Provider),
        )
        .expect("provider places for globex");

    let summary = harness
        .service
        .daily_report(lunch_date(), None)
        .expect("report")
        .summary();

    let companies: Vec<(&str, usize)> = summary
        .company_counts
        .iter()
        .map(|entry| (entry.company_id.0.as_str(), entry.count))
        .collect();
    assert_eq!(companies, vec![("acme", 2), ("globex", 1)]);
    assert_eq!(summary.order_count, 3);
}

#[test]
fn repeat_orders_by_one_user_count_once() {
    let harness = harness();
    let first = place(&harness, "emp-1", "veg-bowl");
    let mut second_day = first.clone();
    second_day.id = crate::orders::domain::OrderId("ord-other".to_string());
    second_day.lunch_option_id = LunchOptionId("retired-dish".to_string());

    let report = DailyOrderReport::from_orders(&[first, second_day], &[]);
    assert_eq!(report.distinct_user_count, 1);
    assert_eq!(report.order_count, 2);

    let names: Vec<String> = report
        .summary()
        .meal_counts
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert!(names.contains(&"retired-dish".to_string()));
    assert!(names.contains(&"veg-bowl".to_string()));
}

#[test]
fn average_rounds_half_up() {
    let harness = harness();
    let mut a = place(&harness, "emp-1", "veg-bowl");
    let mut b = place(&harness, "emp-2", "veg-bowl");
    a.subsidized_price = money("0.01");
    b.subsidized_price = money("0.02");

    let report = DailyOrderReport::from_orders(&[a, b], &[]);
    // 0.015 -> 0.02
    assert_eq!(report.average_paid(), money("0.02"));
}

use super::super::domain::{CompanyId, LunchOption, LunchOptionId, Money, Order, OrderStatus, UserId};
use super::views::{
    CompanyCountEntry, DailyReportSummary, MealCountEntry, SpendSummary, StatusCountEntry,
};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealTally {
    pub name: String,
    pub count: usize,
}

/// Read-only fold over the orders of one day.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DailyOrderReport {
    pub status_counts: HashMap<OrderStatus, usize>,
    pub meal_counts: HashMap<LunchOptionId, MealTally>,
    pub company_counts: BTreeMap<CompanyId, usize>,
    pub distinct_user_count: usize,
    pub order_count: usize,
    pub list_total: Money,
    pub paid_total: Money,
}

impl DailyOrderReport {
    /// Tally `orders`, resolving meal names from `options`. Options missing
    /// from the menu are reported under their id.
    pub fn from_orders(orders: &[Order], options: &[LunchOption]) -> Self {
        let names: HashMap<&LunchOptionId, &str> = options
            .iter()
            .map(|option| (&option.id, option.name.as_str()))
            .collect();

        let mut report = Self {
            status_counts: OrderStatus::ordered()
                .into_iter()
                .map(|status| (status, 0))
                .collect(),
            ..Self::default()
        };
        let mut users: HashSet<&UserId> = HashSet::new();
        let mut list_cents = 0i64;
        let mut paid_cents = 0i64;

        for order in orders {
            *report.status_counts.entry(order.status).or_default() += 1;

            report
                .meal_counts
                .entry(order.lunch_option_id.clone())
                .or_insert_with(|| MealTally {
                    name: names
                        .get(&order.lunch_option_id)
                        .map(|name| name.to_string())
                        .unwrap_or_else(|| order.lunch_option_id.0.clone()),
                    count: 0,
                })
                .count += 1;

            *report
                .company_counts
                .entry(order.company_id.clone())
                .or_default() += 1;

            users.insert(&order.user_id);
            list_cents += order.unit_price.cents();
            paid_cents += order.subsidized_price.cents();
        }

        report.order_count = orders.len();
        report.distinct_user_count = users.len();
        report.list_total = Money::from_cents(list_cents);
        report.paid_total = Money::from_cents(paid_cents);
        report
    }

    pub fn count(&self, status: OrderStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    pub fn subsidy_total(&self) -> Money {
        Money::from_cents(self.list_total.cents() - self.paid_total.cents())
    }

    /// Mean paid price per order, rounded half-up; zero for an empty day.
    pub fn average_paid(&self) -> Money {
        if self.order_count == 0 {
            return Money::ZERO;
        }
        let count = self.order_count as i64;
        Money::from_cents((self.paid_total.cents() * 2 + count) / (count * 2))
    }

    pub fn summary(&self) -> DailyReportSummary {
        let status_counts = OrderStatus::ordered()
            .into_iter()
            .map(|status| StatusCountEntry {
                status,
                status_label: status.label(),
                count: self.count(status),
            })
            .collect();

        let mut meal_counts: Vec<MealCountEntry> = self
            .meal_counts
            .iter()
            .map(|(id, tally)| MealCountEntry {
                lunch_option_id: id.clone(),
                name: tally.name.clone(),
                count: tally.count,
            })
            .collect();
        meal_counts.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.lunch_option_id.cmp(&b.lunch_option_id))
        });

        let company_counts = self
            .company_counts
            .iter()
            .map(|(company_id, count)| CompanyCountEntry {
                company_id: company_id.clone(),
                count: *count,
            })
            .collect();

        DailyReportSummary {
            order_count: self.order_count,
            distinct_user_count: self.distinct_user_count,
            status_counts,
            meal_counts,
            company_counts,
            spend: SpendSummary {
                list_total: self.list_total,
                paid_total: self.paid_total,
                subsidy_total: self.subsidy_total(),
                average_paid: self.average_paid(),
            },
        }
    }
}

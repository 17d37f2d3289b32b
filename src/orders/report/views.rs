use serde::Serialize;

use super::super::domain::{CompanyId, LunchOptionId, Money, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCountEntry {
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MealCountEntry {
    pub lunch_option_id: LunchOptionId,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyCountEntry {
    pub company_id: CompanyId,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendSummary {
    pub list_total: Money,
    pub paid_total: Money,
    pub subsidy_total: Money,
    pub average_paid: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyReportSummary {
    pub order_count: usize,
    pub distinct_user_count: usize,
    pub status_counts: Vec<StatusCountEntry>,
    pub meal_counts: Vec<MealCountEntry>,
    pub company_counts: Vec<CompanyCountEntry>,
    pub spend: SpendSummary,
}

use crate::infra::{in_memory_service, seeded_menu};
use chrono::{Local, NaiveDate};
use clap::Args;
use meal_orders::config::OrderingConfig;
use meal_orders::error::AppError;
use meal_orders::orders::import::orders_from_path;
use meal_orders::orders::report::views::DailyReportSummary;
use meal_orders::orders::{
    Actor, CompanyId, InMemoryOrderRepository, InMemorySubsidies, LunchOptionId, NewOrder,
    OrderLifecycleService, OrderStatus, Role, UserId,
};
use meal_orders::session::{ProfileRefresher, RefreshError, RefreshOutcome, UserProfile};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DailyReportArgs {
    /// CSV export of orders (id,user_id,company_id,lunch_option_id,date,status,unit_price,subsidized_price)
    #[arg(long)]
    pub(crate) orders_csv: PathBuf,
    /// Lunch date to summarize (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Restrict the report to one client company
    #[arg(long)]
    pub(crate) company: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Lunch date for the scripted order (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Client company placing the order
    #[arg(long, default_value = "acme")]
    pub(crate) company: String,
    /// Lunch option to order from the seeded menu
    #[arg(long, default_value = "veg-bowl")]
    pub(crate) lunch_option: String,
}

pub(crate) fn run_daily_report(args: DailyReportArgs) -> Result<(), AppError> {
    let DailyReportArgs {
        orders_csv,
        date,
        company,
    } = args;

    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let company = company.map(CompanyId);
    let repository = InMemoryOrderRepository::with_orders(orders_from_path(&orders_csv)?);
    let service = OrderLifecycleService::new(
        Arc::new(repository),
        Arc::new(seeded_menu()),
        Arc::new(InMemorySubsidies::default()),
    );

    let report = service.daily_report(date, company.as_ref())?;
    render_daily_report(&report.summary(), date, company.as_ref());

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        date,
        company,
        lunch_option,
    } = args;

    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let company = CompanyId(company);
    let ordering = OrderingConfig::default();
    let service = in_memory_service(&ordering);

    println!("Meal ordering demo for {} on {}", company, date);

    let employee = Actor {
        user_id: UserId("emp-1".to_string()),
        role: Role::Employee,
        company_id: Some(company.clone()),
    };
    let supervisor = Actor {
        user_id: UserId("sup-1".to_string()),
        role: Role::Supervisor,
        company_id: Some(company.clone()),
    };
    let provider = Actor {
        user_id: UserId("chef-1".to_string()),
        role: Role::Provider,
        company_id: None,
    };

    let refresher: ProfileRefresher<UserProfile> =
        ProfileRefresher::new(ordering.profile_refresh_min_interval);
    let load = || async { Ok::<_, RefreshError>(employee.clone()) };
    let (first, second) = tokio::join!(refresher.refresh(load), refresher.refresh(load));
    println!("\nSession");
    for outcome in [first, second] {
        match outcome {
            Ok(RefreshOutcome::Refreshed(profile)) => {
                println!("- profile loaded for {} ({})", profile.user_id, profile.role)
            }
            Ok(RefreshOutcome::Joined(profile)) => {
                println!("- joined in-flight refresh for {}", profile.user_id)
            }
            Ok(RefreshOutcome::Throttled(_)) => println!("- refresh throttled"),
            Err(err) => println!("- refresh failed: {}", err),
        }
    }

    println!("\nLifecycle");
    let order = service.place_order(
        NewOrder {
            user_id: employee.user_id.clone(),
            company_id: company.clone(),
            lunch_option_id: LunchOptionId(lunch_option),
            date,
        },
        &employee,
    );
    let order = match order {
        Ok(order) => order,
        Err(err) => {
            println!("- placement rejected: {}", err);
            return Ok(());
        }
    };
    println!(
        "- placed {} -> {} | list {} | subsidized {} | subsidy {}",
        order.id,
        order.status,
        order.unit_price,
        order.subsidized_price,
        order.subsidy_amount()
    );

    let steps = [
        (OrderStatus::Prepared, &employee),
        (OrderStatus::Approved, &supervisor),
        (OrderStatus::Prepared, &provider),
        (OrderStatus::Approved, &provider),
        (OrderStatus::Prepared, &provider),
        (OrderStatus::Delivered, &provider),
        (OrderStatus::Rejected, &supervisor),
    ];
    for (requested, actor) in steps {
        match service.transition(&order.id, requested, actor) {
            Ok(updated) => println!(
                "- {} requested {} -> now {} (approved by {})",
                actor.role,
                requested,
                updated.status,
                updated
                    .approved_by
                    .as_ref()
                    .map_or_else(|| "nobody".to_string(), ToString::to_string)
            ),
            Err(err) => println!(
                "- {} requested {} -> {} ({})",
                actor.role,
                requested,
                err.kind(),
                err
            ),
        }
    }

    let report = service.daily_report(date, Some(&company))?;
    render_daily_report(&report.summary(), date, Some(&company));

    Ok(())
}

pub(crate) fn render_daily_report(
    summary: &DailyReportSummary,
    date: NaiveDate,
    company: Option<&CompanyId>,
) {
    match company {
        Some(company) => println!("\nDaily orders for {} on {}", company, date),
        None => println!("\nDaily orders for all companies on {}", date),
    }
    println!(
        "{} orders from {} employees",
        summary.order_count, summary.distinct_user_count
    );

    println!("\nBy status");
    for entry in &summary.status_counts {
        println!("- {}: {}", entry.status_label, entry.count);
    }

    if summary.meal_counts.is_empty() {
        println!("\nMeals: none");
    } else {
        println!("\nMeals");
        for entry in &summary.meal_counts {
            println!("- {}: {}", entry.name, entry.count);
        }
    }

    if summary.company_counts.len() > 1 {
        println!("\nCompanies");
        for entry in &summary.company_counts {
            println!("- {}: {}", entry.company_id, entry.count);
        }
    }

    println!(
        "\nSpend: list {} | paid {} | subsidy {} | average paid {}",
        summary.spend.list_total,
        summary.spend.paid_total,
        summary.spend.subsidy_total,
        summary.spend.average_paid
    );
}

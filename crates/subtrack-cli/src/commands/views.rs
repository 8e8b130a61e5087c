//! Calendar, upcoming and analytics command implementations

use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use subtrack_core::currency::CurrencyNormalizer;
use subtrack_core::db::Database;
use subtrack_core::{AnalyticsAggregator, MonthCalendar, Portfolio};

use super::{money, resolve_user, truncate};

const WEEKDAYS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];

/// Text month grid; billing days carry a `*`
pub fn render_month_grid(calendar: &MonthCalendar) -> String {
    let title = chrono::Month::try_from(calendar.month as u8)
        .map(|m| format!("{} {}", m.name(), calendar.year))
        .unwrap_or_else(|_| format!("{}-{:02}", calendar.year, calendar.month));

    let mut out = format!("{:^28}\n", title);
    for day in WEEKDAYS {
        out.push_str(&format!("{:>3} ", day));
    }
    out = out.trim_end().to_string();
    out.push('\n');

    let mut line = "    ".repeat(calendar.first_weekday as usize);
    let mut column = calendar.first_weekday;
    for day in 1..=calendar.days_in_month {
        let billed = calendar.day_totals.iter().any(|t| t.day == day);
        line.push_str(&format!("{:>3}{}", day, if billed { '*' } else { ' ' }));
        column += 1;
        if column == 7 {
            out.push_str(line.trim_end());
            out.push('\n');
            line.clear();
            column = 0;
        }
    }
    if !line.is_empty() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn cmd_calendar(
    db: &Database,
    normalizer: &dyn CurrencyNormalizer,
    user: &str,
    year: Option<i32>,
    month: Option<u32>,
    today: NaiveDate,
) -> Result<()> {
    let user = resolve_user(db, user)?;
    let portfolio = Portfolio::load(db, user.id, normalizer)?;
    let calendar = portfolio.calendar(
        year.unwrap_or(today.year()),
        month.unwrap_or(today.month()),
    )?;

    println!();
    print!("{}", render_month_grid(&calendar));
    println!();

    if calendar.entries.is_empty() {
        println!("   No billing this month.");
        return Ok(());
    }

    for entry in &calendar.entries {
        println!(
            "   {:>2} │ {:20} │ {:>12} │ {}",
            entry.day,
            truncate(&entry.name, 20),
            money(entry.amount, &user.display_currency),
            entry.billing_cycle.as_str()
        );
    }
    println!("   ─────────────────────────────────────────────");
    println!(
        "   Total: {}",
        money(calendar.total, &user.display_currency)
    );

    Ok(())
}

pub fn cmd_upcoming(
    db: &Database,
    normalizer: &dyn CurrencyNormalizer,
    user: &str,
    days: i64,
    today: NaiveDate,
) -> Result<()> {
    if days < 0 {
        bail!("--days must not be negative");
    }
    let user = resolve_user(db, user)?;
    let payments = Portfolio::load(db, user.id, normalizer)?.upcoming(today, days);

    println!();
    println!("📅 Due in the next {} days", days);
    println!("   ─────────────────────────────────────────────");

    if payments.is_empty() {
        println!("   Nothing due.");
        return Ok(());
    }

    for payment in &payments {
        let when = match payment.days_until {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {} days", n),
        };
        println!(
            "   {} │ {:20} │ {:>12} │ {}",
            payment.billing_date,
            truncate(&payment.name, 20),
            money(payment.amount, &user.display_currency),
            when
        );
    }

    Ok(())
}

pub fn cmd_analytics(
    db: &Database,
    normalizer: &dyn CurrencyNormalizer,
    aggregator: &AnalyticsAggregator,
    user: &str,
    json: bool,
    today: NaiveDate,
) -> Result<()> {
    let user = resolve_user(db, user)?;
    let report = Portfolio::load(db, user.id, normalizer)?.analytics(db, normalizer, aggregator, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let cur = &report.currency;
    println!();
    println!("📊 Spend for {} as of {}", user.email, report.as_of);
    println!("   ─────────────────────────────────────────────");
    println!("   Monthly:  {}", money(report.totals.monthly_total, cur));
    println!("   Yearly:   {}", money(report.totals.yearly_total, cur));
    println!(
        "   Active:   {} of {} subscriptions",
        report.totals.active_count, report.totals.total_count
    );
    println!(
        "   Trend:    {} ({:+.1}% vs last month)",
        report.trend.direction.as_str(),
        report.trend.monthly_change
    );
    println!("   Efficiency score: {}/100", report.efficiency_score);

    if !report.category_breakdown.is_empty() {
        println!();
        println!("   By category:");
        for bucket in &report.category_breakdown {
            println!(
                "     {:20} {:>12}",
                truncate(&bucket.label, 20),
                money(bucket.value, cur)
            );
        }
    }

    if !report.top_subscriptions.is_empty() {
        println!();
        println!("   Most expensive (monthly):");
        for (rank, sub) in report.top_subscriptions.iter().enumerate() {
            println!(
                "     {}. {:20} {:>12}",
                rank + 1,
                truncate(&sub.name, 20),
                money(sub.monthly_equivalent, cur)
            );
        }
    }

    if report.estimates.potential_savings > 0.0 {
        println!();
        println!(
            "   💡 Potential savings: {}/month ({})",
            money(report.estimates.potential_savings, cur),
            report.estimates.basis
        );
    }

    Ok(())
}

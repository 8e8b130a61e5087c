//! Individual analytics metrics

use super::types::{BreakdownBucket, RankedSubscription, TrendDirection, TrendPoint, TrendSummary};
use crate::models::{BillingCycle, Subscription};

/// Average weeks per month used to normalize weekly prices.
///
/// A fixed approximation (52/12 ≈ 4.33), not derived per calendar month.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Share of monthly-cycle spend assumed recoverable by switching to annual billing
pub const SAVINGS_RATE: f64 = 0.15;

/// Cost of one billing period expressed per month
pub fn monthly_equivalent(amount: f64, cycle: BillingCycle) -> f64 {
    match cycle {
        BillingCycle::Weekly => amount * WEEKS_PER_MONTH,
        BillingCycle::Monthly => amount,
        BillingCycle::Quarterly => amount / 3.0,
        BillingCycle::Yearly => amount / 12.0,
    }
}

/// Percent change from `previous` to `current`; 0 when there is no baseline
pub fn month_over_month(previous: f64, current: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Summarize a trailing series (oldest to newest)
pub fn summarize_trend(points: &[TrendPoint]) -> TrendSummary {
    let current = points.last().map(|p| p.amount).unwrap_or(0.0);
    let previous = if points.len() >= 2 {
        points[points.len() - 2].amount
    } else {
        0.0
    };
    let monthly_change = month_over_month(previous, current);
    let direction = TrendDirection::from_change(monthly_change);

    TrendSummary {
        points: points.to_vec(),
        current,
        previous,
        monthly_change,
        direction,
        is_increasing: direction == TrendDirection::Increasing,
    }
}

/// Group values by label, dropping non-positive buckets
///
/// Buckets are ordered by value descending; equal values keep the order in
/// which their label first appeared.
pub fn breakdown<I>(items: I) -> Vec<BreakdownBucket>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut buckets: Vec<BreakdownBucket> = Vec::new();
    for (label, value) in items {
        match buckets.iter_mut().find(|b| b.label == label) {
            Some(bucket) => {
                bucket.value += value;
                bucket.count += 1;
            }
            None => buckets.push(BreakdownBucket {
                label,
                value,
                count: 1,
            }),
        }
    }

    buckets.retain(|b| b.value > 0.0);
    buckets.sort_by(|a, b| b.value.total_cmp(&a.value));
    buckets
}

/// The `n` most expensive subscriptions by monthly equivalent
///
/// Stable, so equal costs keep input order.
pub fn top_subscriptions(subs: &[Subscription], n: usize) -> Vec<RankedSubscription> {
    let mut ranked: Vec<RankedSubscription> = subs
        .iter()
        .map(|s| RankedSubscription {
            subscription_id: s.id,
            name: s.name.clone(),
            category: s.category.clone(),
            billing_cycle: s.billing_cycle,
            monthly_equivalent: monthly_equivalent(s.effective_amount(), s.billing_cycle),
        })
        .collect();
    ranked.sort_by(|a, b| b.monthly_equivalent.total_cmp(&a.monthly_equivalent));
    ranked.truncate(n);
    ranked
}

/// Percent of tracked subscriptions that are active, rounded
pub fn efficiency_score(active: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (active as f64 / total as f64 * 100.0).round() as u32
}

/// Illustrative savings from moving monthly plans to annual billing
pub fn potential_savings(monthly_cycle_count: usize, average_monthly_spend: f64) -> f64 {
    monthly_cycle_count as f64 * average_monthly_spend * SAVINGS_RATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionStatus;
    use chrono::{NaiveDate, Utc};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sub(id: i64, amount: f64, cycle: BillingCycle, next: NaiveDate) -> Subscription {
        Subscription {
            id,
            user_id: 1,
            name: format!("Sub {}", id),
            category: None,
            amount,
            currency: "USD".to_string(),
            display_amount: None,
            billing_cycle: cycle,
            next_billing_date: next,
            status: SubscriptionStatus::Active,
            alert_enabled: true,
            alert_days: 3,
            last_alert_sent: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_monthly_equivalent_scenarios() {
        assert!(approx(monthly_equivalent(12.0, BillingCycle::Yearly), 1.0));
        assert!(approx(monthly_equivalent(10.0, BillingCycle::Weekly), 43.3));
        assert!(approx(monthly_equivalent(30.0, BillingCycle::Quarterly), 10.0));
        assert!(approx(monthly_equivalent(9.99, BillingCycle::Monthly), 9.99));
    }

    #[test]
    fn test_monthly_equivalent_is_linear() {
        for cycle in BillingCycle::all() {
            let a = 7.5;
            let b = 19.25;
            let k = 3.0;
            assert!(approx(
                monthly_equivalent(a + b, *cycle),
                monthly_equivalent(a, *cycle) + monthly_equivalent(b, *cycle)
            ));
            assert!(approx(
                monthly_equivalent(k * a, *cycle),
                k * monthly_equivalent(a, *cycle)
            ));
        }
    }

    #[test]
    fn test_month_over_month() {
        assert!(approx(month_over_month(100.0, 120.0), 20.0));
        assert!(approx(month_over_month(200.0, 150.0), -25.0));
        assert_eq!(month_over_month(0.0, 50.0), 0.0);
    }

    #[test]
    fn test_summarize_trend_increasing() {
        let points = vec![
            TrendPoint {
                month: "2026-01".to_string(),
                amount: 100.0,
            },
            TrendPoint {
                month: "2026-02".to_string(),
                amount: 120.0,
            },
        ];
        let summary = summarize_trend(&points);
        assert!(approx(summary.monthly_change, 20.0));
        assert!(summary.is_increasing);
        assert_eq!(summary.direction, TrendDirection::Increasing);
        assert_eq!(summary.current, 120.0);
        assert_eq!(summary.previous, 100.0);
    }

    #[test]
    fn test_summarize_trend_short_series() {
        let summary = summarize_trend(&[]);
        assert_eq!(summary.monthly_change, 0.0);
        assert_eq!(summary.direction, TrendDirection::Flat);
        assert!(!summary.is_increasing);

        let single = vec![TrendPoint {
            month: "2026-02".to_string(),
            amount: 80.0,
        }];
        let summary = summarize_trend(&single);
        assert_eq!(summary.current, 80.0);
        assert_eq!(summary.monthly_change, 0.0);
    }

    #[test]
    fn test_breakdown_drops_zero_and_orders() {
        let buckets = breakdown(vec![
            ("Music".to_string(), 10.0),
            ("Video".to_string(), 15.0),
            ("Free".to_string(), 0.0),
            ("Music".to_string(), 5.0),
            ("News".to_string(), 15.0),
        ]);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Music", "Video", "News"]);
        assert_eq!(buckets[0].count, 2);
        assert!(approx(buckets[0].value, 15.0));
    }

    #[test]
    fn test_top_subscriptions_stable() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let subs = vec![
            sub(1, 10.0, BillingCycle::Monthly, d),
            sub(2, 120.0, BillingCycle::Yearly, d),
            sub(3, 10.0, BillingCycle::Monthly, d),
            sub(4, 5.0, BillingCycle::Weekly, d),
        ];
        let top = top_subscriptions(&subs, 3);
        let ids: Vec<i64> = top.iter().map(|r| r.subscription_id).collect();
        assert_eq!(ids, vec![4, 1, 2]);

        let all = top_subscriptions(&subs, 10);
        let ids: Vec<i64> = all.iter().map(|r| r.subscription_id).collect();
        assert_eq!(ids, vec![4, 1, 2, 3]);
    }

    #[test]
    fn test_efficiency_score() {
        assert_eq!(efficiency_score(0, 0), 0);
        assert_eq!(efficiency_score(2, 3), 67);
        assert_eq!(efficiency_score(5, 5), 100);
    }

    #[test]
    fn test_potential_savings() {
        assert!(approx(potential_savings(4, 20.0), 12.0));
        assert_eq!(potential_savings(0, 20.0), 0.0);
    }
}

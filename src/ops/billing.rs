//! Billing and monitoring operations
//!
//! Both are simplified: cost figures and metric series are not queried yet,
//! but inputs are fully validated and the payload shapes are stable.

use super::Services;
use crate::error::{ToolError, ValidationError};
use crate::gcp::auth::CredentialContext;
use crate::models::{
    short_name, Aggregation, BillingCost, BillingGroup, CostAmount, Metrics, TimeRange,
};
use crate::validate::parse_interval;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_COST_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct CostQuery {
    pub time_range: TimeRange,
    pub group_by: Vec<BillingGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsQuery {
    pub metric_type: String,
    pub interval: String,
    pub aggregation: Aggregation,
}

pub async fn get_billing_cost(
    svc: &Services,
    ctx: &CredentialContext,
    query: &CostQuery,
) -> Result<BillingCost, ToolError> {
    let info = svc
        .call("get billing info", svc.provider.get_billing_info(ctx))
        .await?;
    let account_name = match (info.billing_enabled, info.billing_account_name) {
        (Some(true), Some(name)) if !name.is_empty() => name,
        _ => {
            return Err(ToolError::NotFound(format!(
                "billing is not enabled for project '{}'",
                ctx.project_id()
            )))
        },
    };
    let account_id = short_name(&account_name);

    let account = svc
        .call(
            "get billing account",
            svc.provider.get_billing_account(ctx, &account_id),
        )
        .await?;

    tracing::debug!(
        "Billing account {} for {} ({:?})",
        account_id,
        ctx.project_id(),
        account.display_name
    );

    Ok(BillingCost {
        project_id: ctx.project_id().to_string(),
        billing_account_id: account_id,
        billing_account_name: account.display_name,
        time_range: query.time_range.clone(),
        total_cost: CostAmount {
            amount: 0.0,
            currency: account.currency_code,
        },
        costs_by_service: BTreeMap::new(),
        group_by: query.group_by.clone(),
        placeholder: true,
    })
}

/// Placeholder: echoes the validated query with an empty series
pub fn get_metrics(ctx: &CredentialContext, query: &MetricsQuery) -> Result<Metrics, ToolError> {
    let interval_seconds = parse_interval(&query.interval)
        .ok_or_else(|| ValidationError::new("interval", "expected <number><s|m|h|d>"))?;

    Ok(Metrics {
        message: format!("Metrics retrieved for {}", query.metric_type),
        project_id: ctx.project_id().to_string(),
        metric_type: query.metric_type.clone(),
        interval: query.interval.clone(),
        interval_seconds,
        aggregation: query.aggregation,
        data: serde_json::Map::new(),
        placeholder: true,
    })
}

/// Resolve the reporting window: end defaults to `today`, start to 30 days
/// before end
pub fn time_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<TimeRange, ValidationError> {
    let end = match end {
        Some(value) => parse_date("end_date", value)?,
        None => today,
    };
    let start = match start {
        Some(value) => parse_date("start_date", value)?,
        None => end - Duration::days(DEFAULT_COST_WINDOW_DAYS),
    };

    if start > end {
        return Err(ValidationError::new("start_date", "must not be after end_date"));
    }

    Ok(TimeRange {
        start: start.format(DATE_FORMAT).to_string(),
        end: end.format(DATE_FORMAT).to_string(),
    })
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ValidationError::new(field, "expected a date in YYYY-MM-DD format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_default_window_is_thirty_days_to_today() {
        let range = time_range(None, None, day("2024-03-31")).unwrap();
        assert_eq!(range.start, "2024-03-01");
        assert_eq!(range.end, "2024-03-31");
    }

    #[test]
    fn test_start_defaults_relative_to_explicit_end() {
        let range = time_range(None, Some("2024-01-31"), day("2024-06-01")).unwrap();
        assert_eq!(range.start, "2024-01-01");
    }

    #[test]
    fn test_start_after_end_is_invalid_input() {
        let err = time_range(Some("2024-02-01"), Some("2024-01-01"), day("2024-06-01")).unwrap_err();
        assert_eq!(err.field, "start_date");
    }

    #[test]
    fn test_bad_date_names_field() {
        let err = time_range(None, Some("31/01/2024"), day("2024-06-01")).unwrap_err();
        assert_eq!(err.field, "end_date");
    }
}

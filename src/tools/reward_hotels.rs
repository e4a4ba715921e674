use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use super::{Tool, ToolContext, check_range, failure, parameters_schema, parse_args, parse_date};
use crate::pointsyeah::PointsYeahApi;
use crate::pointsyeah::hotel_api::HotelSearchInput;

pub const NAME: &str = "pointsYeahHotelSearch";

pub struct RewardHotelSearchTool {
    api: Arc<dyn PointsYeahApi>,
}

impl RewardHotelSearchTool {
    pub fn new(api: Arc<dyn PointsYeahApi>) -> Self {
        Self { api }
    }
}

fn validate_paging(input: &HotelSearchInput) -> Result<(), Value> {
    check_range("page", input.page.map(u64::from), 1, None)
        .and_then(|_| check_range("page_size", input.page_size.map(u64::from), 1, Some(50)))
        .map_err(|e| failure(e.clone(), format!("Invalid hotel search parameters: {e}")))
}

/// Check-in no earlier than today (request timezone), check-out strictly after check-in
fn validate_stay(input: &HotelSearchInput, ctx: &ToolContext) -> Result<(), Value> {
    let check_in = parse_date("Check-in date", &input.check_in_date)
        .map_err(|e| failure(e, format!("Invalid check-in date: {}", input.check_in_date)))?;
    let check_out = parse_date("Check-out date", &input.check_out_date)
        .map_err(|e| failure(e, format!("Invalid check-out date: {}", input.check_out_date)))?;

    let today = ctx.today();
    if check_in < today {
        return Err(failure(
            format!(
                "Check-in date ({}) cannot be in the past. Current date: {today}",
                input.check_in_date
            ),
            format!("Invalid check-in date: {}", input.check_in_date),
        ));
    }
    if check_out <= check_in {
        return Err(failure(
            format!(
                "Check-out date ({}) must be after check-in date ({})",
                input.check_out_date, input.check_in_date
            ),
            format!(
                "Invalid date range: {} to {}",
                input.check_in_date, input.check_out_date
            ),
        ));
    }
    Ok(())
}

#[async_trait]
impl Tool for RewardHotelSearchTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Search for reward hotels using points/miles through PointsYeah API. This tool finds hotels that can be booked with loyalty program points rather than cash, perfect for travelers looking to maximize their points value."
    }

    fn parameters(&self) -> Value {
        parameters_schema::<HotelSearchInput>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Value {
        let input: HotelSearchInput = match parse_args(NAME, args) {
            Ok(input) => input,
            Err(fail) => return fail,
        };
        tracing::info!(
            destination = input.destination.as_deref().unwrap_or("anywhere"),
            check_in = %input.check_in_date,
            check_out = %input.check_out_date,
            "Executing reward hotel search"
        );

        if let Err(fail) = validate_paging(&input) {
            return fail;
        }
        if let Err(fail) = validate_stay(&input, ctx) {
            return fail;
        }

        let params = input.to_api_params();
        match self.api.search_hotels(&params).await {
            Ok(data) => {
                let destination = input
                    .destination
                    .as_deref()
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or("anywhere");
                let summary = format!(
                    "Found {} reward hotel options in {destination} for {} to {}. Showing {} results sorted by {}.",
                    data.total,
                    input.check_in_date,
                    input.check_out_date,
                    data.results.len(),
                    params.sort.as_str(),
                );
                json!({
                    "success": true,
                    "pointsyeah_hotel_data": data,
                    "search_params": input,
                    "summary": summary,
                })
            }
            Err(e) => {
                tracing::error!("PointsYeah hotel search failed: {}", e);
                failure(e.to_string(), format!("Failed to search hotels: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TravelAssistantError;
    use crate::pointsyeah::MockPointsYeahApi;
    use crate::pointsyeah::hotel_api::{HotelLocation, HotelSearchResponse};
    use chrono::{DateTime, Utc};

    // 2026-06-15 14:00 UTC is already 2026-06-16 in Auckland
    fn ctx(tz: chrono_tz::Tz) -> ToolContext {
        ToolContext {
            timezone: tz,
            now: DateTime::parse_from_rfc3339("2026-06-15T14:00:00Z")
                .expect("valid")
                .with_timezone(&Utc),
        }
    }

    #[tokio::test]
    async fn past_check_in_is_rejected() {
        let mut api = MockPointsYeahApi::new();
        api.expect_search_hotels().never();
        let tool = RewardHotelSearchTool::new(Arc::new(api));

        let out = tool
            .execute(
                json!({"destination": "Tokyo", "checkInDate": "2026-06-14", "checkOutDate": "2026-06-18"}),
                &ctx(chrono_tz::UTC),
            )
            .await;
        assert_eq!(out["success"], false);
        assert_eq!(
            out["error"],
            "Check-in date (2026-06-14) cannot be in the past. Current date: 2026-06-15"
        );
        assert_eq!(out["summary"], "Invalid check-in date: 2026-06-14");
    }

    #[tokio::test]
    async fn today_depends_on_request_timezone() {
        let mut api = MockPointsYeahApi::new();
        api.expect_search_hotels().never();
        let tool = RewardHotelSearchTool::new(Arc::new(api));

        let out = tool
            .execute(
                json!({"checkInDate": "2026-06-15", "checkOutDate": "2026-06-18"}),
                &ctx(chrono_tz::Pacific::Auckland),
            )
            .await;
        assert_eq!(out["success"], false);
    }

    #[tokio::test]
    async fn paging_outside_bounds_is_rejected() {
        let mut api = MockPointsYeahApi::new();
        api.expect_search_hotels().never();
        let tool = RewardHotelSearchTool::new(Arc::new(api));

        let out = tool
            .execute(
                json!({"checkInDate": "2026-07-01", "checkOutDate": "2026-07-04", "page_size": 500}),
                &ctx(chrono_tz::UTC),
            )
            .await;
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "page_size must be between 1 and 50 (got 500)");

        let out = tool
            .execute(
                json!({"checkInDate": "2026-07-01", "checkOutDate": "2026-07-04", "page": 0}),
                &ctx(chrono_tz::UTC),
            )
            .await;
        assert_eq!(out["summary"], "Invalid hotel search parameters: page must be at least 1 (got 0)");
    }

    #[tokio::test]
    async fn check_out_must_follow_check_in() {
        let mut api = MockPointsYeahApi::new();
        api.expect_search_hotels().never();
        let tool = RewardHotelSearchTool::new(Arc::new(api));

        let out = tool
            .execute(
                json!({"checkInDate": "2026-07-01", "checkOutDate": "2026-07-01"}),
                &ctx(chrono_tz::UTC),
            )
            .await;
        assert_eq!(out["success"], false);
        assert_eq!(out["summary"], "Invalid date range: 2026-07-01 to 2026-07-01");
    }

    #[tokio::test]
    async fn successful_search_summarizes() {
        let mut api = MockPointsYeahApi::new();
        api.expect_search_hotels()
            .withf(|p| matches!(&p.location, HotelLocation::Resolved(l) if l.city == "Paris"))
            .times(1)
            .returning(|_| {
                Ok(HotelSearchResponse {
                    total: 120,
                    results: vec![Default::default(), Default::default()],
                })
            });
        let tool = RewardHotelSearchTool::new(Arc::new(api));

        let out = tool
            .execute(
                json!({"destination": "paris", "checkInDate": "2026-07-01", "checkOutDate": "2026-07-04", "sort": "points"}),
                &ctx(chrono_tz::UTC),
            )
            .await;
        assert_eq!(out["success"], true);
        assert_eq!(
            out["summary"],
            "Found 120 reward hotel options in paris for 2026-07-01 to 2026-07-04. Showing 2 results sorted by points."
        );
        assert_eq!(out["search_params"]["checkInDate"], "2026-07-01");
    }

    #[tokio::test]
    async fn unauthorized_is_reported() {
        let mut api = MockPointsYeahApi::new();
        api.expect_search_hotels().returning(|_| {
            Err(TravelAssistantError::Unauthorized(
                "PointsYeah Hotel API requires authentication. Please configure POINTSYEAH_API_KEY in environment variables.".to_string(),
            ))
        });
        let tool = RewardHotelSearchTool::new(Arc::new(api));

        let out = tool
            .execute(
                json!({"checkInDate": "2026-07-01", "checkOutDate": "2026-07-04"}),
                &ctx(chrono_tz::UTC),
            )
            .await;
        assert_eq!(out["success"], false);
        assert!(
            out["error"]
                .as_str()
                .unwrap_or_default()
                .contains("POINTSYEAH_API_KEY")
        );
        assert!(
            out["summary"]
                .as_str()
                .unwrap_or_default()
                .starts_with("Failed to search hotels:")
        );
    }
}

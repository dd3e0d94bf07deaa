use serde::Serialize;
use tracing::{debug, info};

use crate::config::DashboardConfig;
use crate::error::AppResult;
use crate::services::timeline::{self, DayGroup, WeekGroup};
use crate::services::warehouse::Warehouse;

/// Everything a sink needs to draw one page.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub calendar: Vec<DayGroup>,
    pub weeks: Vec<WeekGroup>,
}

/// Fetch, normalize and group the timeline for one request.
///
/// The three queries run one after the other; the first failure aborts the
/// whole pass and nothing partial is returned.
pub async fn build_dashboard(
    warehouse: &dyn Warehouse,
    settings: &DashboardConfig,
) -> AppResult<Dashboard> {
    let calendar = warehouse.calendar_events().await?;
    let mut summaries = warehouse.summary_events().await?;
    let weekly = warehouse.weekly_summaries().await?;

    debug!(
        "Fetched {} calendar events, {} summary events, {} weekly summaries",
        calendar.len(),
        summaries.len(),
        weekly.len()
    );

    // newest first; events keep this order inside their week
    summaries.sort_by(|a, b| b.date.cmp(&a.date));

    let dashboard = Dashboard {
        calendar: timeline::group_calendar(&calendar, settings.calendar_days, settings.ordinal_style),
        weeks: timeline::group_weeks(&weekly, &summaries, settings.ordinal_style),
    };

    info!(
        "Built dashboard with {} days and {} weeks",
        dashboard.calendar.len(),
        dashboard.weeks.len()
    );

    Ok(dashboard)
}

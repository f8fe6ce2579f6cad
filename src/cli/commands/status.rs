//! Status command - load every query and report its cache state

use super::connect;
use crate::config::Config;
use crate::error::SpacesResult;
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(config: &Config) -> SpacesResult<()> {
    let ctx = UiContext::detect();
    let session = connect(config, &ctx).await?;
    let store = session.queries.store();

    ui::intro(&ctx, "Spaces Status");
    ui::key_value(&ctx, "Server", config.server.url.as_deref().unwrap_or("-"));
    ui::key_value(&ctx, "Transport", store.transport_name());

    ui::section(&ctx, "Queries");
    for summary in store.summaries() {
        let mut detail = format!("{} (v{})", summary.status, summary.fetched_at);
        if let Some(updated_at) = summary.updated_at {
            detail.push_str(&format!(", updated {}", updated_at.format("%H:%M:%S")));
        }
        if !summary.immediate {
            let upstreams = store.upstreams(&summary.key);
            if !upstreams.is_empty() {
                detail.push_str(&format!(", after {}", upstreams.join(", ")));
            }
        }
        ui::key_value_status(&ctx, &summary.key, &detail, summary.error.is_none());

        if let Some(ref error) = summary.error {
            let kept = if summary.has_data { " (keeping previous data)" } else { "" };
            ui::step_error_detail(
                &ctx,
                &format!("{} {} failed{}", summary.method, error.kind, kept),
                &error.message,
            );
        }
    }

    ui::section(&ctx, "Totals");
    ui::key_value(
        &ctx,
        "Joined",
        &session.selectors.joined_workspaces().len().to_string(),
    );
    ui::key_value(&ctx, "Unread", &session.selectors.total_unread().to_string());

    let order = store.trigger_order();
    if !order.is_empty() {
        ui::remark(&ctx, &format!("Trigger order: {}", order.join(" -> ")));
    }

    Ok(())
}

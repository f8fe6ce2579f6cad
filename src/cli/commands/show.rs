//! Show command - details for one workspace

use super::connect;
use crate::cli::args::{OutputFormat, ShowArgs};
use crate::config::Config;
use crate::error::{SpacesError, SpacesResult};
use crate::ui::{self, UiContext};

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> SpacesResult<()> {
    let ctx = match args.format {
        OutputFormat::Table => UiContext::detect(),
        OutputFormat::Json | OutputFormat::Plain => UiContext::non_interactive(),
    };
    let session = connect(config, &ctx).await?;
    let selectors = &session.selectors;

    let workspace = selectors
        .find_workspace(args.id.as_str())
        .ok_or_else(|| SpacesError::WorkspaceNotFound(args.id.clone()))?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&workspace)?);
        }
        OutputFormat::Plain => {
            println!("{}\t{}", workspace.id, workspace.title);
        }
        OutputFormat::Table => {
            ui::intro(&ctx, &workspace.title);
            ui::key_value(&ctx, "ID", workspace.id.as_str());
            ui::key_value(&ctx, "Team", workspace.owner_team.as_deref().unwrap_or("-"));
            ui::key_value(&ctx, "Icon", workspace.icon.as_deref().unwrap_or("-"));
            ui::key_value(
                &ctx,
                "Visibility",
                if workspace.is_private { "private" } else { "public" },
            );
            if let Some(ref archived_at) = workspace.archived_at {
                ui::key_value(&ctx, "Archived", archived_at);
            }
            if let Some(ref modified) = workspace.last_modified {
                ui::key_value(&ctx, "Modified", modified);
            }
            ui::key_value(&ctx, "Tasks", &workspace.task_count.to_string());
            ui::key_value(&ctx, "Discussions", &workspace.discussion_count.to_string());
            ui::key_value(
                &ctx,
                "Unread",
                &selectors.unread_count_for(&workspace.id).to_string(),
            );
            ui::key_value_status(
                &ctx,
                "Joined",
                if selectors.has_joined(&workspace.id) { "yes" } else { "no" },
                selectors.has_joined(&workspace.id),
            );

            ui::section(&ctx, &format!("Members ({})", workspace.members.len()));
            if workspace.members.is_empty() {
                ui::remark(&ctx, "No members");
            }
            for member in &workspace.members {
                println!("  {}", member.user);
            }
        }
    }

    Ok(())
}

//! List command - show workspaces

use super::connect;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::SpacesResult;
use crate::model::Workspace;
use crate::selectors::Selectors;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// Workspace row with its per-user fields
#[derive(Serialize)]
struct Row<'a> {
    #[serde(flatten)]
    workspace: &'a Workspace,
    joined: bool,
    unread: u64,
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> SpacesResult<()> {
    let ctx = match args.format {
        OutputFormat::Table => UiContext::detect(),
        OutputFormat::Json | OutputFormat::Plain => UiContext::non_interactive(),
    };
    let session = connect(config, &ctx).await?;
    let selectors = &session.selectors;

    let workspaces = if args.joined {
        selectors.joined_workspaces()
    } else {
        session
            .queries
            .workspaces()
            .data()
            .map(|list| list.to_vec())
            .unwrap_or_default()
    };
    let filtered: Vec<Workspace> = workspaces
        .into_iter()
        .filter(|w| args.all || !w.is_archived())
        .collect();

    if filtered.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&ctx, "No workspaces"),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&ctx, selectors, &filtered),
        OutputFormat::Json => print_json(selectors, &filtered)?,
        OutputFormat::Plain => print_plain(&filtered),
    }

    Ok(())
}

fn print_table(ctx: &UiContext, selectors: &Selectors, workspaces: &[Workspace]) {
    ui::intro(ctx, "Workspaces");

    println!(
        "{:<8} {:<30} {:<8} {:<8} {:<8} {:<8}",
        style("ID").bold(),
        style("TITLE").bold(),
        style("MEMBERS").bold(),
        style("TASKS").bold(),
        style("UNREAD").bold(),
        style("JOINED").bold()
    );
    println!("{}", "-".repeat(75));

    for workspace in workspaces {
        let unread = selectors.unread_count_for(&workspace.id);
        let unread_styled = if unread > 0 {
            style(unread.to_string()).yellow().bold()
        } else {
            style(unread.to_string()).dim()
        };
        let joined = if selectors.has_joined(&workspace.id) {
            style("yes").green()
        } else {
            style("no").dim()
        };
        let title = if workspace.is_archived() {
            format!("{} (archived)", workspace.title)
        } else {
            workspace.title.clone()
        };

        println!(
            "{:<8} {:<30} {:<8} {:<8} {:<8} {:<8}",
            workspace.id,
            title,
            workspace.members.len(),
            workspace.task_count,
            unread_styled,
            joined
        );
    }

    println!();
    println!("{} workspace(s)", workspaces.len());
}

fn print_json(selectors: &Selectors, workspaces: &[Workspace]) -> SpacesResult<()> {
    let rows: Vec<Row<'_>> = workspaces
        .iter()
        .map(|workspace| Row {
            workspace,
            joined: selectors.has_joined(&workspace.id),
            unread: selectors.unread_count_for(&workspace.id),
        })
        .collect();
    let json = serde_json::to_string_pretty(&rows)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(workspaces: &[Workspace]) {
    for workspace in workspaces {
        println!("{}\t{}", workspace.id, workspace.title);
    }
}

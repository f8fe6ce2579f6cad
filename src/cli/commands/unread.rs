//! Unread command - print one workspace's unread count

use super::connect;
use crate::cli::args::UnreadArgs;
use crate::config::Config;
use crate::error::SpacesResult;
use crate::ui::UiContext;

/// Execute the unread command
///
/// Prints `0` for unknown workspaces or when the counts could not be loaded.
pub async fn execute(args: UnreadArgs, config: &Config) -> SpacesResult<()> {
    let session = connect(config, &UiContext::non_interactive()).await?;
    println!("{}", session.selectors.unread_count_for(args.id.as_str()));
    Ok(())
}

//! CLI command implementations

pub mod completions;
pub mod config;
pub mod list;
pub mod show;
pub mod status;
pub mod unread;

pub use completions::execute as completions;
pub use config::execute as config;
pub use list::execute as list;
pub use show::execute as show;
pub use status::execute as status;
pub use unread::execute as unread;

use crate::cache::{QueryStore, Settled};
use crate::config::Config;
use crate::error::SpacesResult;
use crate::registry::WorkspaceQueries;
use crate::selectors::Selectors;
use crate::transport::{HttpTransport, Transport};
use crate::ui::{TaskSpinner, UiContext};
use std::sync::Arc;

/// Queries registered against the configured server, loaded once
pub(crate) struct Session {
    pub queries: WorkspaceQueries,
    pub selectors: Selectors,
    pub outcomes: Vec<(&'static str, Settled)>,
}

impl Session {
    /// Keys whose last fetch failed
    pub fn failures(&self) -> Vec<(&'static str, String)> {
        self.outcomes
            .iter()
            .filter_map(|(key, outcome)| match outcome {
                Settled::Failed(error) => Some((*key, error.message.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Register the workspace queries over HTTP and wait for them to settle
pub(crate) async fn connect(config: &Config, ctx: &UiContext) -> SpacesResult<Session> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.server)?);
    let store = QueryStore::new(transport);

    let mut spinner = TaskSpinner::new(ctx);
    spinner.start("Loading workspaces...");

    let queries = WorkspaceQueries::register(&store, &config.endpoints)?;
    let outcomes = queries.ready().await;
    let selectors = Selectors::new(&queries);
    let session = Session {
        queries,
        selectors,
        outcomes,
    };

    let failures = session.failures();
    if failures.is_empty() {
        let count = session.queries.workspaces().data().map_or(0, |w| w.len());
        spinner.stop(&format!("Loaded {} workspaces", count));
    } else {
        let keys: Vec<&str> = failures.iter().map(|(key, _)| *key).collect();
        spinner.stop_warn(&format!("Some queries failed: {}", keys.join(", ")));
    }

    Ok(session)
}

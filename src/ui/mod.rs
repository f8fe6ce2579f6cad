//! UI module for consistent CLI output
//!
//! Uses `cliclack` for spinners and styled log lines in a terminal, with
//! automatic fallback to plain output in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use spaces::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Loading workspaces...");
//! // ... await queries ...
//! spinner.stop("Loaded 12 workspaces");
//!
//! ui::key_value(&ctx, "Title", "Engineering");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, remark, section, step_error_detail, step_info,
    step_ok_detail, step_warn_hint,
};
pub use progress::TaskSpinner;

//! Hugo integration for the plinth build orchestrator.
//!
//! Wraps the external `hugo` executable: snapshots the deploy environment,
//! builds the argument list for each invocation, and runs the process with
//! inherited standard streams.

pub mod args;
pub mod env;
pub mod process;

pub use args::{hugo_args, hugo_binary, resolve_base_url, BaseUrlPolicy, BuildMode, SitePaths};
pub use env::DeployEnv;
pub use process::{run_hugo, HugoError};

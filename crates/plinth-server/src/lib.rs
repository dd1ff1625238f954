//! Development server with live reload for plinth sites.
//!
//! Serves the build output directory, watches the source trees, and pushes
//! reload notifications to connected browsers over WebSocket.

pub mod livereload;
pub mod server;
pub mod watcher;

pub use livereload::{livereload_script, ReloadHub, ReloadMessage, ReloadStrategy};
pub use server::{BoundServer, DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent, WatchRoots};

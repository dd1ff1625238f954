//! Asset pipelines for the plinth build orchestrator.
//!
//! Two independent, stateless leaves: a stylesheet pipeline (import
//! inlining, browser-target lowering, minification) and a script bundler
//! (relative-import module graph, UMD output with a source map).

pub mod css;
pub mod js;

pub use css::{process_css, CssConfig, CssError};
pub use js::{bundle_js, BundleError, BundleOptions, BundleOutput};

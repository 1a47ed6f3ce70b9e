//! Systemaictl library - exposes the front-end modules for testing

pub mod approval_ui;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod repl;
pub mod wizard;

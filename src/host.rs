//! The host build tool boundary.
//!
//! The pipeline is embedded in a host that owns the dev-server transport,
//! the file watcher and the bundler. Everything the pipeline needs from it
//! is captured here: the host's resolved settings in [`HostContext`], the
//! [`Logger`] sink for dev-time diagnostics, and the prefixed single-line
//! format every logged message uses.

use crate::assemble::{DocumentAssembly, HtmlShell};
use std::path::PathBuf;
use std::sync::Arc;

/// What the host is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Dev server: files are processed per request.
    Serve,
    /// Batch build: all inputs are compiled up front.
    Build,
}

/// Host settings the pipeline consumes, handed over once the host has
/// resolved its own configuration.
#[derive(Clone)]
pub struct HostContext {
    /// Project root. Content paths and build outputs are relative to it.
    pub root: PathBuf,
    /// The host's own bundle output directory, relative to `root`.
    pub out_dir: String,
    pub command: Command,
    /// Host mode string, e.g. `development` or `production`.
    pub mode: String,
    pub logger: Arc<dyn Logger>,
    /// Document-assembly collaborator exposed to transforms.
    pub document_assembly: Arc<dyn DocumentAssembly>,
}

impl HostContext {
    /// Context with the default stderr logger and the shipped document
    /// shell.
    pub fn new(
        root: impl Into<PathBuf>,
        out_dir: impl Into<String>,
        command: Command,
        mode: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            out_dir: out_dir.into(),
            command,
            mode: mode.into(),
            logger: Arc::new(StderrLogger),
            document_assembly: Arc::new(HtmlShell::new(command)),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_document_assembly(mut self, assembly: Arc<dyn DocumentAssembly>) -> Self {
        self.document_assembly = assembly;
        self
    }
}

/// Sink for the pipeline's diagnostics, normally backed by the host's own
/// logger.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default logger writing every line to stderr.
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn info(&self, message: &str) {
        eprintln!("{message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }
}

fn prefixed(prefix: &str, message: &str) -> String {
    format!("  {prefix}  | {message}")
}

pub fn format_info(message: &str) -> String {
    prefixed("ℹ️", message)
}

pub fn format_warn(message: &str) -> String {
    prefixed("⚠️", message)
}

pub fn format_error(message: &str) -> String {
    prefixed("🛑", message)
}

//! The transform capability: the contract every per-file transform follows.
//!
//! A transform takes the raw text of a content file plus a per-invocation
//! [`TransformContext`] and returns a [`TransformOutput`]: plain text, or an
//! [`Artifact`] carrying its text in a conventional `value` field. Whatever
//! comes back is narrowed through [`normalize`] before anything is cached
//! or written, so the rest of the pipeline only ever sees final text.
//!
//! Two transforms ship with the crate:
//!
//! - [`identity`], the default transformer: content passes through
//!   untouched.
//! - [`markdown`], the supported path for `.md` content: renders markdown
//!   to an HTML fragment and hands it to the document-assembly collaborator
//!   for the full document.
//!
//! Hosts and override modules supply their own by implementing
//! [`Transform`]; plain `Fn(&str, &TransformContext) -> TransformOutput`
//! closures implement it automatically.

use crate::assemble::DocumentAssembly;
use crate::host::Command;
use pulldown_cmark::{Parser, html as md_html};
use std::sync::Arc;

/// Collaborators exposed to transforms: document assembly and nothing else.
#[derive(Clone)]
pub struct Capabilities {
    pub document_assembly: Arc<dyn DocumentAssembly>,
}

/// Read-only context handed to every transform invocation.
///
/// `file` is set per file before each call and never reused across files.
#[derive(Clone)]
pub struct TransformContext {
    /// Host mode string, e.g. `development` or `production`.
    pub mode: String,
    /// Whether the host is serving or building.
    pub command: Command,
    /// Path of the file being transformed, relative to the project root.
    pub file: String,
    pub capabilities: Capabilities,
}

/// A non-text transform result that carries its payload in `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    /// The textual payload. `None` is an invalid shape.
    pub value: Option<String>,
    /// Path of the source the artifact was produced from, if any.
    pub path: Option<String>,
}

impl Artifact {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            path: None,
        }
    }
}

/// What a transform returns: plain text, or a text-bearing artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutput {
    Text(String),
    Artifact(Artifact),
}

impl From<String> for TransformOutput {
    fn from(text: String) -> Self {
        TransformOutput::Text(text)
    }
}

impl From<&str> for TransformOutput {
    fn from(text: &str) -> Self {
        TransformOutput::Text(text.to_string())
    }
}

impl From<Artifact> for TransformOutput {
    fn from(artifact: Artifact) -> Self {
        TransformOutput::Artifact(artifact)
    }
}

/// A per-file content transform.
pub trait Transform: Send + Sync {
    fn apply(&self, content: &str, ctx: &TransformContext) -> TransformOutput;
}

impl<F> Transform for F
where
    F: Fn(&str, &TransformContext) -> TransformOutput + Send + Sync,
{
    fn apply(&self, content: &str, ctx: &TransformContext) -> TransformOutput {
        self(content, ctx)
    }
}

/// The default transformer: returns the content unchanged.
pub fn identity() -> Arc<dyn Transform> {
    Arc::new(|content: &str, _ctx: &TransformContext| TransformOutput::Text(content.to_string()))
}

/// Markdown to a complete HTML document.
///
/// Renders the content to an HTML fragment and assembles the full document
/// through the collaborator in the context, so serve-mode client injection
/// and host-supplied shells apply automatically.
pub fn markdown() -> Arc<dyn Transform> {
    Arc::new(|content: &str, ctx: &TransformContext| {
        let parser = Parser::new(content);
        let mut fragment = String::new();
        md_html::push_html(&mut fragment, parser);
        TransformOutput::Text(ctx.capabilities.document_assembly.assemble(&fragment))
    })
}

/// Narrow a transform result to final text.
///
/// Text passes through; an artifact contributes its `value`. An artifact
/// without one is the invalid shape, reported against `origin` (the
/// request path in dev, the input path in a build).
pub fn normalize(output: TransformOutput, origin: &str) -> Result<String, String> {
    match output {
        TransformOutput::Text(text) => Ok(text),
        TransformOutput::Artifact(artifact) => artifact.value.ok_or_else(|| {
            format!("{origin} was resolved invalidly, expected text or a text-bearing artifact")
        }),
    }
}

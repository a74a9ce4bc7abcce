//! Document assembly: turning a transformed fragment into a complete page.
//!
//! The pipeline never builds documents itself. Transforms that want a full
//! page go through the [`DocumentAssembly`] collaborator exposed in their
//! context, so the host can plug in its own renderer. [`HtmlShell`] is the
//! shipped implementation: a minimal shell using
//! [maud](https://maud.lambda.xyz/) for compile-time checked markup.

use crate::host::Command;
use maud::{DOCTYPE, PreEscaped, html};

/// Module script injected first in `<head>` in serve mode so hot reload
/// keeps working for processed files.
pub const DEV_CLIENT_SRC: &str = "/@vite/client";

/// Turns a transformed HTML fragment into a complete document.
pub trait DocumentAssembly: Send + Sync {
    fn assemble(&self, fragment: &str) -> String;
}

/// Minimal document shell around transformed fragments.
///
/// Content that already is a complete document (leading doctype) passes
/// through untouched. Everything else is wrapped in
/// doctype/html/head/body with charset, viewport and title metadata.
pub struct HtmlShell {
    title: String,
    inject_client: bool,
}

impl HtmlShell {
    pub fn new(command: Command) -> Self {
        Self {
            title: "unified".to_string(),
            inject_client: command == Command::Serve,
        }
    }

    /// Replace the default `unified` document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

fn is_document(fragment: &str) -> bool {
    let head = fragment.trim_start();
    head.get(.."<!doctype".len())
        .is_some_and(|p| p.eq_ignore_ascii_case("<!doctype"))
}

impl DocumentAssembly for HtmlShell {
    fn assemble(&self, fragment: &str) -> String {
        if is_document(fragment) {
            return fragment.to_string();
        }
        html! {
            (DOCTYPE)
            html {
                head {
                    @if self.inject_client {
                        script type="module" src=(DEV_CLIENT_SRC) {}
                    }
                    meta charset="UTF-8";
                    meta http-equiv="X-UA-Compatible" content="IE=edge";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (self.title) }
                }
                body {
                    (PreEscaped(fragment))
                }
            }
        }
        .into_string()
    }
}

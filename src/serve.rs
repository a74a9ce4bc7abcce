//! Dev-server request handling.
//!
//! The host mounts [`handle`] in its middleware chain. Requests outside the
//! content directory or extension list delegate onward (`Ok(None)`);
//! everything else flows cache → stat → override resolution → transform →
//! normalization → response.
//!
//! ## Error shaping
//!
//! Failures are recovered locally into responses rather than propagated: a
//! missing or directory target is a bare 404, an invalid override is a
//! logged 501 carrying the validation message, and a shape-violating
//! transform result is a logged 500. Only raw filesystem errors from
//! reading an existing file bubble out to the host.

use crate::cache::ContentCache;
use crate::config::ResolvedConfig;
use crate::host::{HostContext, format_error};
use crate::loader::CapabilityLoader;
use crate::resolver::{TransformOutcome, resolve_override};
use crate::transform::{Capabilities, TransformContext, normalize};
use std::collections::BTreeMap;
use std::fs;
use std::io;

/// Response header carrying the cache status of a processed file.
pub const CACHE_HEADER: &str = "X-VITE-PLUGIN-UNIFIED-CACHE";

/// Query parameter whose mere presence bypasses the cache read for one
/// request.
pub const NOCACHE_PARAM: &str = "vite-plugin-unified-nocache";

/// One inbound request as the host middleware hands it over.
#[derive(Debug, Clone)]
pub struct Request {
    /// Original URL: path plus optional query string.
    pub url: String,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// The response handed back to the host transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl Response {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// True when the query string contains `name` as a parameter key.
fn query_has(query: &str, name: &str) -> bool {
    query
        .split('&')
        .any(|pair| pair.split('=').next().unwrap_or(pair) == name)
}

/// Handle one request. `Ok(None)` means out of scope: the host should
/// delegate to its next handler.
pub fn handle(
    config: &ResolvedConfig,
    host: &HostContext,
    cache: &ContentCache,
    loader: &dyn CapabilityLoader,
    request: &Request,
) -> io::Result<Option<Response>> {
    let (path, query) = match request.url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (request.url.as_str(), ""),
    };

    if !path.starts_with(&config.directory) {
        return Ok(None);
    }
    if !config
        .extensions
        .iter()
        .any(|ext| path.ends_with(&format!(".{ext}")))
    {
        return Ok(None);
    }

    // The bypass flag disables the cache read for this request only; the
    // freshly computed value is still written back below.
    let may_read = config.server.cache && !query_has(query, NOCACHE_PARAM);

    if may_read && let Some(body) = cache.get(path) {
        return Ok(Some(
            Response::new(200)
                .with_header(CACHE_HEADER, "hit")
                .with_body(body),
        ));
    }

    let file_path = host.root.join(path.trim_start_matches('/'));
    let missing = match fs::metadata(&file_path) {
        Ok(meta) => meta.is_dir(),
        Err(_) => true,
    };
    if missing {
        return Ok(Some(Response::new(404)));
    }

    let transform = match resolve_override(&file_path, &config.transform.export_name, loader) {
        TransformOutcome::Invalid(message) => {
            host.logger.error(&format_error(&message));
            return Ok(Some(Response::new(501).with_body(message)));
        }
        TransformOutcome::NoOverride => config.transform.default_transformer.clone(),
        TransformOutcome::Override(transform) => transform,
    };

    let content = fs::read_to_string(&file_path)?;
    let ctx = TransformContext {
        mode: host.mode.clone(),
        command: host.command,
        file: path.trim_start_matches('/').to_string(),
        capabilities: Capabilities {
            document_assembly: host.document_assembly.clone(),
        },
    };

    let body = match normalize(transform.apply(&content, &ctx), path) {
        Ok(body) => body,
        Err(message) => {
            host.logger.error(&format_error(&message));
            return Ok(Some(Response::new(500).with_body(message)));
        }
    };

    if config.server.cache {
        cache.insert(path, body.clone());
    }

    let mut response = Response::new(200)
        .with_header(CACHE_HEADER, "miss")
        .with_body(body);
    for (name, value) in &config.server.response_headers {
        response.headers.insert(name.clone(), value.clone());
    }
    Ok(Some(response))
}

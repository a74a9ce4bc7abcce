//! Plugin lifecycle: the entry points the host drives.
//!
//! | Host signal | Entry point |
//! |-------------|-------------|
//! | config resolved | [`UnifiedPlugin::new`] |
//! | server setup | [`UnifiedPlugin::handle_request`] |
//! | file changed | [`UnifiedPlugin::on_file_change`] |
//! | build start | [`UnifiedPlugin::on_build_start`] |
//! | bundle written | [`UnifiedPlugin::on_write_bundle`] |
//!
//! One plugin instance owns one resolved configuration and one response
//! cache; both live and die with it. Nothing is shared across instances,
//! so two plugins in one process cannot leak cached responses into each
//! other.

use crate::cache::ContentCache;
use crate::compile::{self, CompileError};
use crate::config::{Config, ConfigError, ResolvedConfig};
use crate::host::{Command, HostContext};
use crate::loader::{CapabilityLoader, ModuleRegistry};
use crate::reconcile;
use crate::serve::{self, Request, Response};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// What the host should do after a file-change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotUpdate {
    /// The change touched the content directory: invalidation ran and the
    /// host should broadcast a full client reload.
    FullReload,
    /// The change was out of scope; nothing happened.
    Ignored,
}

/// The content pipeline, ready to be wired into a host's plugin hooks.
pub struct UnifiedPlugin {
    config: ResolvedConfig,
    host: HostContext,
    cache: ContentCache,
    loader: Arc<dyn CapabilityLoader>,
    files_written: AtomicUsize,
}

impl UnifiedPlugin {
    /// Resolve `config` against the host's settings and set up the plugin
    /// state. The override-module loader starts as an empty registry; use
    /// [`UnifiedPlugin::with_loader`] to supply a populated one.
    pub fn new(config: Config, host: HostContext) -> Result<Self, ConfigError> {
        Self::with_loader(config, host, Arc::new(ModuleRegistry::new()))
    }

    pub fn with_loader(
        config: Config,
        host: HostContext,
        loader: Arc<dyn CapabilityLoader>,
    ) -> Result<Self, ConfigError> {
        let config = config.resolve();
        config.validate()?;
        Ok(Self {
            config,
            host,
            cache: ContentCache::new(),
            loader,
            files_written: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Dev-server middleware entry. `Ok(None)` means the request is out of
    /// scope and the host should delegate to its next handler.
    pub fn handle_request(&self, request: &Request) -> io::Result<Option<Response>> {
        serve::handle(
            &self.config,
            &self.host,
            &self.cache,
            self.loader.as_ref(),
            request,
        )
    }

    /// File-watcher entry. Invalidates the affected cache entry and tells
    /// the host whether a full client reload is due. Must run before
    /// subsequent requests so they observe the invalidated cache.
    pub fn on_file_change(&self, changed: &Path) -> HotUpdate {
        let relative = changed.strip_prefix(&self.host.root).unwrap_or(changed);
        let file = format!("/{}", relative.to_string_lossy().trim_start_matches('/'));

        if !file.starts_with(&self.config.directory) {
            return HotUpdate::Ignored;
        }
        if file.ends_with(".unified.js") || file.ends_with(".unified.ts") {
            self.cache.remove_override_match(&file);
        } else {
            self.cache.remove(&file);
        }
        HotUpdate::FullReload
    }

    /// Build-start entry. Compiles the whole batch when the host command
    /// is `Build`, a no-op on the dev server. Returns the number of files
    /// written.
    pub fn on_build_start(&self) -> Result<usize, CompileError> {
        if self.host.command != Command::Build {
            return Ok(0);
        }
        let written = compile::compile(&self.config, &self.host, self.loader.as_ref())?;
        self.files_written.store(written.len(), Ordering::SeqCst);
        Ok(written.len())
    }

    /// Post-bundle entry. Flattens the nested output directory the host's
    /// entry-point mechanism produces, a no-op when the build wrote
    /// nothing.
    pub fn on_write_bundle(&self) -> io::Result<()> {
        if self.files_written.load(Ordering::SeqCst) == 0 {
            return Ok(());
        }
        reconcile::reconcile(&self.host.root, &self.host.out_dir)
    }
}

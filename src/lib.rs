//! # Unified Pipeline
//!
//! A content-processing pipeline that embeds into a web build tool as a
//! plugin. It discovers authored files under a configured directory,
//! resolves a per-file transform (the configured default, or a
//! file-specific override sitting next to the content), executes it, and
//! either serves the result from the dev server or writes it during a
//! batch build.
//!
//! # Architecture: One Pipeline, Two Execution Modes
//!
//! The same resolution and transform logic runs in two modes that differ
//! in error handling and concurrency:
//!
//! ```text
//! Serve   request → cache → stat → resolve override → transform → respond
//!         (failures become 404/500/501 responses; one task per request)
//!
//! Build   glob → map output paths → resolve override → transform → write
//!         (first failure aborts the whole batch; files fan out on rayon)
//! ```
//!
//! Dev-server responses are cached per request path and invalidated by
//! file-change notifications; a changed override file invalidates its
//! sibling content file's entry. Build outputs are reconciled after the
//! host writes its bundle, flattening the extra nesting its entry-point
//! mechanism introduces.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Partial config surface, defaults, glob derivation, TOML overlays |
//! | [`transform`] | Transform contract, execution context, output normalization |
//! | [`resolver`] | Override discovery (`<base>.unified.{js,ts}`) and validation |
//! | [`loader`] | Runtime loading of override modules, shipped as a registry |
//! | [`cache`] | Dev-server response cache with targeted invalidation |
//! | [`serve`] | Request pipeline: routing, cache cycle, response shaping |
//! | [`compile`] | Build pipeline: glob expansion, path mapping, parallel writes |
//! | [`reconcile`] | Post-bundle flattening of the nested output directory |
//! | [`assemble`] | Document-assembly collaborator boundary and shipped shell |
//! | [`host`] | Host boundary: context, command, logger |
//! | [`plugin`] | Lifecycle entry points tying everything together |
//!
//! # Design Decisions
//!
//! ## An Owned Cache, Not Process State
//!
//! The response cache is a component owned by the plugin instance: created
//! with it, discarded with it. Two plugin instances in one process cannot
//! observe each other's cached responses, and tests get a fresh cache per
//! instance for free.
//!
//! ## Two Config Types Instead of Sprinkled Defaults
//!
//! Configuration is a pair of explicit types: the partial [`config::Config`]
//! where every field is omittable, and the fully-populated
//! [`config::ResolvedConfig`] produced by one total, pure merge. Code past
//! resolution never reasons about missing fields. The one dependent
//! default, the build glob derived from directory and extensions, is
//! computed exactly once at resolution time.
//!
//! ## Overrides Through a Loader Seam
//!
//! Override files are discovered on disk, but their code is obtained
//! through the [`loader::CapabilityLoader`] trait. The shipped
//! [`loader::ModuleRegistry`] is a compiled registry of transform
//! factories re-invoked on every load; hosts with an embedded interpreter
//! can substitute their own loader without touching resolution, which
//! keeps the export-name and callability validation in one place.
//!
//! ## A Closed Result Type for Transform Output
//!
//! Transforms return [`transform::TransformOutput`]: text, or an artifact
//! carrying text in its `value` field. The result is narrowed immediately
//! after the call, before anything is cached or written, so a misbehaving
//! transform turns into one well-defined error instead of corrupt output.

pub mod assemble;
pub mod cache;
pub mod compile;
pub mod config;
pub mod host;
pub mod loader;
pub mod plugin;
pub mod reconcile;
pub mod resolver;
pub mod serve;
pub mod transform;

pub use plugin::UnifiedPlugin;

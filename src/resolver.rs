//! Override transform discovery and validation.
//!
//! For a content file `name.ext` the override candidates are
//! `name.unified.js` and `name.unified.ts`, sitting next to it. Resolution
//! checks both for existence, loads the winner through the capability
//! loader, and validates that the configured export is present and
//! callable. The three possible answers form [`TransformOutcome`].

use crate::loader::{CapabilityLoader, Export};
use crate::transform::Transform;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of resolving an override for one content file.
pub enum TransformOutcome {
    /// No override file exists; the default transformer applies.
    NoOverride,
    /// An override file exists but failed loading or validation. In dev
    /// the message becomes a 501 response; in a build it aborts the batch.
    Invalid(String),
    /// A valid override transform.
    Override(Arc<dyn Transform>),
}

/// True when the path exists and is not a directory.
fn is_file(path: &Path) -> bool {
    fs::metadata(path).map(|meta| !meta.is_dir()).unwrap_or(false)
}

/// `name.ext` -> `name.unified.<override_ext>` next to the original.
fn candidate(file_path: &Path, override_ext: &str) -> PathBuf {
    let stem = file_path.file_stem().unwrap_or_default().to_string_lossy();
    file_path.with_file_name(format!("{stem}.unified.{override_ext}"))
}

/// Discover and validate the override transform for `file_path`.
///
/// When both candidates exist the `.ts` one wins. The module is loaded
/// fresh on every resolution so edited override files take effect without
/// a restart.
pub fn resolve_override(
    file_path: &Path,
    export_name: &str,
    loader: &dyn CapabilityLoader,
) -> TransformOutcome {
    let js = candidate(file_path, "js");
    let ts = candidate(file_path, "ts");
    let (js_exists, ts_exists) = (is_file(&js), is_file(&ts));

    if !js_exists && !ts_exists {
        return TransformOutcome::NoOverride;
    }
    let path = if ts_exists { ts } else { js };

    let exports = match loader.load(&path) {
        Ok(exports) => exports,
        Err(err) => return TransformOutcome::Invalid(err.to_string()),
    };

    match exports.get(export_name) {
        None => TransformOutcome::Invalid(format!(
            "{} does not export a {} function!",
            path.display(),
            export_name
        )),
        Some(Export::Value(_)) => TransformOutcome::Invalid(format!(
            "{} exports a {} which is not a function!",
            path.display(),
            export_name
        )),
        Some(Export::Transform(transform)) => TransformOutcome::Override(transform.clone()),
    }
}

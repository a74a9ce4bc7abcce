//! Build-mode batch compilation.
//!
//! Invoked once at build start: expands the configured glob into the input
//! list, maps every input to its output path, then runs transform + write
//! for all files through the rayon pool. The batch is fail-fast: the first
//! error aborts everything, and files already written stay on disk.
//!
//! ## Path mapping
//!
//! For an input `src/pages/a/b.md` with the default configuration and a
//! host output directory `dist`:
//!
//! ```text
//! output base   dist/unified          (host out dir + build.out_dir,
//!                                      de-duplicated when out_dir already
//!                                      starts inside the host out dir)
//! residual      a/b.md                (content directory prefix stripped)
//! output        dist/unified/a/b.html (extension swapped per out_format)
//! ```

use crate::config::ResolvedConfig;
use crate::host::HostContext;
use crate::loader::CapabilityLoader;
use crate::resolver::{TransformOutcome, resolve_override};
use crate::transform::{Capabilities, TransformContext, normalize};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("{0}")]
    Resolution(String),
    #[error("{0}")]
    InvalidOutput(String),
}

/// One build input and the output path computed for it. Both paths are
/// relative to the project root; mappings are recomputed every build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMapping {
    pub input: String,
    pub output: String,
}

/// Expand one `{a,b}` alternation group into plain patterns.
fn expand_braces(pattern: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (pattern.find('{'), pattern.rfind('}')) else {
        return vec![pattern.to_string()];
    };
    if close < open {
        return vec![pattern.to_string()];
    }
    let (head, rest) = pattern.split_at(open);
    let body = &rest[1..close - open];
    let tail = &rest[close - open + 1..];
    body.split(',')
        .map(|alt| format!("{head}{alt}{tail}"))
        .collect()
}

/// Strip the relative-dot prefix a derived glob carries so patterns match
/// paths relative to the project root.
fn pattern_body(pattern: &str) -> &str {
    pattern
        .strip_prefix("./")
        .or_else(|| pattern.strip_prefix('/'))
        .unwrap_or(pattern)
}

/// Expand the configured glob(s) against the project root. Leading-`!`
/// patterns exclude matches of the others. Results are relative to the
/// root and sorted.
fn expand_glob(patterns: &[&str], root: &Path) -> Result<Vec<String>, CompileError> {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for pattern in patterns {
        let (negated, body) = match pattern.strip_prefix('!') {
            Some(body) => (true, body),
            None => (false, *pattern),
        };
        for expanded in expand_braces(pattern_body(body)) {
            let compiled = glob::Pattern::new(&expanded)?;
            if negated {
                excludes.push(compiled);
            } else {
                includes.push(compiled);
            }
        }
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        if includes.iter().any(|p| p.matches(&relative))
            && !excludes.iter().any(|p| p.matches(&relative))
        {
            matches.push(relative);
        }
    }
    matches.sort();
    Ok(matches)
}

/// Join the host output directory with the configured one, without double
/// nesting when the configured value already points inside the host's.
fn output_base(host_out: &str, out_dir: &str) -> String {
    match out_dir.strip_prefix(host_out) {
        Some("") => host_out.to_string(),
        Some(rest) if rest.starts_with('/') => format!("{host_out}{rest}"),
        _ => format!("{host_out}/{out_dir}"),
    }
}

/// Compute the output path for one input, relative to the project root.
fn map_output(config: &ResolvedConfig, host: &HostContext, input: &str) -> String {
    let base = output_base(&host.out_dir, &config.build.out_dir);
    // The resolved directory carries a leading slash the relative input
    // lacks, so its length covers the trailing slash too.
    let residual = input.get(config.directory.len()..).unwrap_or(input);

    let mut ext = config.build.out_format.apply(input);
    if !ext.starts_with('.') {
        ext = format!(".{ext}");
    }
    let remapped = Path::new(residual)
        .with_extension(&ext[1..])
        .to_string_lossy()
        .replace('\\', "/");
    format!("{base}/{remapped}")
}

/// Compute all input-to-output mappings for the current build.
pub fn file_mappings(
    config: &ResolvedConfig,
    host: &HostContext,
) -> Result<Vec<FileMapping>, CompileError> {
    let patterns = config.build.glob.patterns();
    let inputs = expand_glob(&patterns, &host.root)?;
    Ok(inputs
        .into_iter()
        .map(|input| {
            let output = map_output(config, host, &input);
            FileMapping { input, output }
        })
        .collect())
}

/// Run the batch: resolve, transform, normalize and write every input.
///
/// Per-file work runs concurrently on the rayon pool. Returns the mappings
/// written so the caller can record the count.
pub fn compile(
    config: &ResolvedConfig,
    host: &HostContext,
    loader: &dyn CapabilityLoader,
) -> Result<Vec<FileMapping>, CompileError> {
    let mappings = file_mappings(config, host)?;
    fs::create_dir_all(
        host.root
            .join(output_base(&host.out_dir, &config.build.out_dir)),
    )?;

    mappings
        .par_iter()
        .try_for_each(|mapping| compile_one(config, host, loader, mapping))?;

    Ok(mappings)
}

fn compile_one(
    config: &ResolvedConfig,
    host: &HostContext,
    loader: &dyn CapabilityLoader,
    mapping: &FileMapping,
) -> Result<(), CompileError> {
    let input_path = host.root.join(&mapping.input);

    let transform = match resolve_override(&input_path, &config.transform.export_name, loader) {
        TransformOutcome::Invalid(message) => return Err(CompileError::Resolution(message)),
        TransformOutcome::NoOverride => config.transform.default_transformer.clone(),
        TransformOutcome::Override(transform) => transform,
    };

    let content = fs::read_to_string(&input_path)?;
    let ctx = TransformContext {
        mode: host.mode.clone(),
        command: host.command,
        file: mapping.input.clone(),
        capabilities: Capabilities {
            document_assembly: host.document_assembly.clone(),
        },
    };
    let body = normalize(transform.apply(&content, &ctx), &mapping.input)
        .map_err(CompileError::InvalidOutput)?;

    let output_path = host.root.join(&mapping.output);
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildConfig, Config, Glob, OutFormat};
    use crate::host::Command;
    use crate::loader::ModuleRegistry;
    use crate::transform::{Artifact, Transform, TransformContext, TransformOutput};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn build_host(root: &Path) -> HostContext {
        HostContext::new(root, "dist", Command::Build, "production")
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    // =========================================================================
    // Glob expansion
    // =========================================================================

    #[test]
    fn expand_braces_single_group() {
        assert_eq!(
            expand_braces("src/pages/**/*.{html,md}"),
            vec!["src/pages/**/*.html", "src/pages/**/*.md"]
        );
    }

    #[test]
    fn expand_braces_without_group() {
        assert_eq!(expand_braces("src/pages/**/*.md"), vec!["src/pages/**/*.md"]);
    }

    #[test]
    fn expand_glob_matches_nested_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "");
        write(tmp.path(), "src/pages/nested/b.md", "");
        write(tmp.path(), "src/pages/c.txt", "");
        write(tmp.path(), "other/d.md", "");

        let matches = expand_glob(&["./src/pages/**/*.md"], tmp.path()).unwrap();
        assert_eq!(matches, vec!["src/pages/a.md", "src/pages/nested/b.md"]);
    }

    #[test]
    fn expand_glob_brace_list() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "");
        write(tmp.path(), "src/pages/b.html", "");
        write(tmp.path(), "src/pages/c.txt", "");

        let matches = expand_glob(&["./src/pages/**/*.{html,md}"], tmp.path()).unwrap();
        assert_eq!(matches, vec!["src/pages/a.md", "src/pages/b.html"]);
    }

    #[test]
    fn expand_glob_negation_excludes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "");
        write(tmp.path(), "src/pages/skip.md", "");

        let matches = expand_glob(
            &["./src/pages/**/*.md", "!./src/pages/skip.md"],
            tmp.path(),
        )
        .unwrap();
        assert_eq!(matches, vec!["src/pages/a.md"]);
    }

    #[test]
    fn expand_glob_invalid_pattern_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = expand_glob(&["./src/[pages/**/*.md"], tmp.path());
        assert!(matches!(result, Err(CompileError::Pattern(_))));
    }

    // =========================================================================
    // Path mapping
    // =========================================================================

    #[test]
    fn output_base_appends_by_default() {
        assert_eq!(output_base("dist", "unified"), "dist/unified");
    }

    #[test]
    fn output_base_deduplicates_nested_out_dir() {
        assert_eq!(output_base("dist", "dist/unified"), "dist/unified");
        assert_eq!(output_base("dist", "dist"), "dist");
    }

    #[test]
    fn output_base_keeps_lookalike_siblings() {
        assert_eq!(output_base("dist", "distx"), "dist/distx");
    }

    #[test]
    fn map_output_swaps_extension_under_base() {
        let config = Config::default().resolve();
        let host = build_host(Path::new("/project"));
        assert_eq!(
            map_output(&config, &host, "src/pages/test.md"),
            "dist/unified/test.html"
        );
        assert_eq!(
            map_output(&config, &host, "src/pages/a/b.md"),
            "dist/unified/a/b.html"
        );
    }

    #[test]
    fn map_output_with_function_format() {
        let config = Config {
            build: BuildConfig {
                out_format: Some(OutFormat::Fn(Arc::new(|_| "js".to_string()))),
                ..BuildConfig::default()
            },
            ..Config::default()
        }
        .resolve();
        let host = build_host(Path::new("/project"));
        assert_eq!(
            map_output(&config, &host, "src/pages/test.md"),
            "dist/unified/test.js"
        );
    }

    #[test]
    fn map_output_accepts_dotted_format() {
        let config = Config {
            build: BuildConfig {
                out_format: Some(OutFormat::from(".txt")),
                ..BuildConfig::default()
            },
            ..Config::default()
        }
        .resolve();
        let host = build_host(Path::new("/project"));
        assert_eq!(
            map_output(&config, &host, "src/pages/test.md"),
            "dist/unified/test.txt"
        );
    }

    #[test]
    fn file_mappings_cover_all_inputs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "");
        write(tmp.path(), "src/pages/nested/b.md", "");

        let config = Config {
            build: BuildConfig {
                out_format: Some(OutFormat::Fn(Arc::new(|_| "js".to_string()))),
                ..BuildConfig::default()
            },
            ..Config::default()
        }
        .resolve();
        let mappings = file_mappings(&config, &build_host(tmp.path())).unwrap();

        assert_eq!(
            mappings,
            vec![
                FileMapping {
                    input: "src/pages/a.md".to_string(),
                    output: "dist/unified/a.js".to_string(),
                },
                FileMapping {
                    input: "src/pages/nested/b.md".to_string(),
                    output: "dist/unified/nested/b.js".to_string(),
                },
            ]
        );
        // Every output lands under the computed base with the new extension.
        assert!(mappings.iter().all(|m| m.output.starts_with("dist/unified/")));
        assert!(mappings.iter().all(|m| m.output.ends_with(".js")));
    }

    // =========================================================================
    // Batch execution
    // =========================================================================

    #[test]
    fn compile_writes_every_mapped_output() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "alpha");
        write(tmp.path(), "src/pages/nested/b.md", "beta");

        let config = Config::default().resolve();
        let written = compile(&config, &build_host(tmp.path()), &ModuleRegistry::new()).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(
            fs::read_to_string(tmp.path().join("dist/unified/a.html")).unwrap(),
            "alpha"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("dist/unified/nested/b.html")).unwrap(),
            "beta"
        );
    }

    #[test]
    fn compile_uses_override_transforms() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "alpha");
        write(tmp.path(), "src/pages/a.unified.ts", "//");

        let registry = ModuleRegistry::new();
        let t: Arc<dyn Transform> = Arc::new(|content: &str, _ctx: &TransformContext| {
            TransformOutput::Text(content.to_uppercase())
        });
        registry.register_transform(tmp.path().join("src/pages/a.unified.ts"), "transform", t);

        let config = Config::default().resolve();
        compile(&config, &build_host(tmp.path()), &registry).unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("dist/unified/a.html")).unwrap(),
            "ALPHA"
        );
    }

    #[test]
    fn invalid_override_aborts_the_batch() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "alpha");
        write(tmp.path(), "src/pages/a.unified.js", "//");

        let registry = ModuleRegistry::new();
        registry.register(tmp.path().join("src/pages/a.unified.js"), || {
            Ok(Default::default())
        });

        let config = Config::default().resolve();
        let err = compile(&config, &build_host(tmp.path()), &registry).unwrap_err();
        let CompileError::Resolution(message) = err else {
            panic!("expected a resolution error");
        };
        assert!(message.ends_with("does not export a transform function!"));
        assert!(!tmp.path().join("dist/unified/a.html").exists());
    }

    #[test]
    fn shape_violation_aborts_the_batch() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "alpha");
        write(tmp.path(), "src/pages/a.unified.ts", "//");

        let registry = ModuleRegistry::new();
        let t: Arc<dyn Transform> =
            Arc::new(|_content: &str, _ctx: &TransformContext| Artifact::default().into());
        registry.register_transform(tmp.path().join("src/pages/a.unified.ts"), "transform", t);

        let config = Config::default().resolve();
        let err = compile(&config, &build_host(tmp.path()), &registry).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOutput(_)));
    }

    #[test]
    fn transform_context_reports_build_command() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "src/pages/a.md", "x");
        write(tmp.path(), "src/pages/a.unified.ts", "//");

        let registry = ModuleRegistry::new();
        let t: Arc<dyn Transform> = Arc::new(|_content: &str, ctx: &TransformContext| {
            TransformOutput::Text(format!("{:?}:{}", ctx.command, ctx.file))
        });
        registry.register_transform(tmp.path().join("src/pages/a.unified.ts"), "transform", t);

        let config = Config::default().resolve();
        compile(&config, &build_host(tmp.path()), &registry).unwrap();
        assert_eq!(
            fs::read_to_string(tmp.path().join("dist/unified/a.html")).unwrap(),
            "Build:src/pages/a.md"
        );
    }

    #[test]
    fn compile_with_no_matches_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let config = Config::default().resolve();
        let written = compile(&config, &build_host(tmp.path()), &ModuleRegistry::new()).unwrap();
        assert!(written.is_empty());
        // The output base is still created, matching the up-front mkdir.
        assert!(tmp.path().join("dist/unified").is_dir());
    }
}

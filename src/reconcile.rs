//! Post-build output reconciliation.
//!
//! Registering compiled outputs as host entry points makes the host emit
//! them one directory too deep: `<out>/<out>/...` instead of `<out>/...`.
//! After the host writes its bundle, [`reconcile`] copies the nested
//! directory's contents up into the real output directory and removes the
//! nested directory. Callers skip the step entirely when the build wrote
//! no files.

use std::fs;
use std::io;
use std::path::Path;

/// Flatten `<root>/<host_out>/<host_out>` into `<root>/<host_out>`.
///
/// I/O errors propagate unwrapped, including the nested directory being
/// absent.
pub fn reconcile(root: &Path, host_out: &str) -> io::Result<()> {
    let out = root.join(host_out);
    let nested = out.join(host_out);
    copy_dir_recursive(&nested, &out)?;
    fs::remove_dir_all(&nested)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

//! File replacement helpers

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace `target` with the bytes of `source`.
///
/// The data is written to a temporary file in the target's directory and
/// renamed over the target, so readers see either the old or the new file.
/// The target's parent directory must already exist.
pub(crate) fn replace_file(source: &Path, target: &Path) -> io::Result<()> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut input = File::open(source)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    io::copy(&mut input, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    fs::set_permissions(tmp.path(), input.metadata()?.permissions())?;

    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Byte-for-byte comparison; a missing file never matches
pub(crate) fn same_contents(a: &Path, b: &Path) -> bool {
    match (fs::read(a), fs::read(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => false,
    }
}

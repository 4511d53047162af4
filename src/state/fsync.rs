//! Crash-safe writes for the relay's state files.
//!
//! The watermark and seen-id files are tiny, but losing or truncating one
//! re-emits history downstream, so every update goes through the
//! write-to-temp-then-rename pattern with both file and directory fsyncs.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Syncs a file's contents and metadata to disk (`fsync(2)`).
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory so a rename inside it survives power loss.
///
/// On POSIX systems a rename updates the directory entry; without syncing
/// the directory itself the entry may not be durable even when the file
/// contents are.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}

/// Atomically replaces `path` with `contents`.
///
/// 1. Write to `<path>.tmp`
/// 2. fsync the temp file
/// 3. Rename over `path`
/// 4. fsync the parent directory
///
/// Readers never observe a partial file: they see either the old contents
/// or the new ones.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp_path = temp_path_for(path);
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(contents)?;
        fsync_file(&file)?;
    }
    fs::rename(&temp_path, path)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fsync_dir(dir)?;
    }
    Ok(())
}

/// Appends `.tmp` to the full file name rather than swapping the extension,
/// so `watermark.bak` becomes `watermark.bak.tmp`, not `watermark.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

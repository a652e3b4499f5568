// SPDX-License-Identifier: MIT

//! Archive unpacking via the `zip` crate (spec.md §9: a real crate rather
//! than reimplementing a zip reader or shelling out to `unzip`).

use crate::error::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Extracts every entry of the zip archive at `bytes` into `dest_dir`,
/// creating directories as needed. Rejects entries that would escape
/// `dest_dir` via `..` components.
pub fn unzip_into(bytes: &[u8], dest_dir: &Path) -> Result<()> {
    let reader = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            continue;
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out_file)?;
        out_file.flush()?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;

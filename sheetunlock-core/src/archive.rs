//! Zip container extraction and repacking

use crate::error::{Result, UnprotectError};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Extract every entry of `package` into `workspace`, keeping the internal layout.
///
/// Returns the entry names in archive order.
pub fn extract(package: &Path, workspace: &Path) -> Result<Vec<String>> {
    let file = File::open(package).map_err(|e| UnprotectError::io(package, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| UnprotectError::corrupt(package, e))?;
    let mut names = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| UnprotectError::corrupt(package, e))?;
        let name = entry.name().to_string();

        // Reject names that would land outside the workspace
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| UnprotectError::corrupt(package, format!("unsafe entry name '{}'", name)))?;
        let target = workspace.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| UnprotectError::io(&target, e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| UnprotectError::io(parent, e))?;
            }
            let mut buffer = Vec::new();
            entry
                .read_to_end(&mut buffer)
                .map_err(|e| UnprotectError::corrupt(package, format!("entry '{}': {}", name, e)))?;
            fs::write(&target, &buffer).map_err(|e| UnprotectError::io(&target, e))?;
        }
        names.push(name);
    }

    log::debug!(
        "Extracted {} entries from {} to {}",
        names.len(),
        package.display(),
        workspace.display()
    );
    Ok(names)
}

/// Write every file under `workspace` into a new deflated zip at `output`.
///
/// The container is assembled in a temporary file beside `output` and renamed
/// into place once complete, replacing any existing file.
pub fn pack(workspace: &Path, output: &Path) -> Result<()> {
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let staging = tempfile::Builder::new()
        .prefix(".sheetunlock-")
        .suffix(".part")
        .tempfile_in(&parent)
        .map_err(|e| UnprotectError::io(&parent, e))?;

    let mut zip_writer = ZipWriter::new(BufWriter::new(
        staging.reopen().map_err(|e| UnprotectError::io(staging.path(), e))?,
    ));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0usize;

    for entry in WalkDir::new(workspace).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(workspace, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry_name(workspace, entry.path())?;
        let content = fs::read(entry.path()).map_err(|e| UnprotectError::io(entry.path(), e))?;

        zip_writer
            .start_file(name, options)
            .map_err(|e| zip_error(output, e))?;
        zip_writer
            .write_all(&content)
            .map_err(|e| UnprotectError::io(output, e))?;
        count += 1;
    }

    let mut inner = zip_writer.finish().map_err(|e| zip_error(output, e))?;
    inner.flush().map_err(|e| UnprotectError::io(output, e))?;
    drop(inner);

    staging
        .persist(output)
        .map_err(|e| UnprotectError::io(output, e.error))?;

    log::debug!("Packed {} entries into {}", count, output.display());
    Ok(())
}

/// Entry name for `path`: its path relative to `workspace`, joined with `/`
fn entry_name(workspace: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(workspace).map_err(|_| {
        UnprotectError::Unexpected(format!(
            "{} is not inside {}",
            path.display(),
            workspace.display()
        ))
    })?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

fn zip_error(path: &Path, err: ZipError) -> UnprotectError {
    match err {
        ZipError::Io(e) => UnprotectError::io(path, e),
        other => UnprotectError::Unexpected(format!("writing {}: {}", path.display(), other)),
    }
}

fn walk_error(workspace: &Path, err: walkdir::Error) -> UnprotectError {
    let path = err.path().unwrap_or(workspace).to_path_buf();
    match err.into_io_error() {
        Some(e) => UnprotectError::io(&path, e),
        None => UnprotectError::Unexpected(format!("filesystem loop under {}", path.display())),
    }
}

//! Archive extraction for downloaded tool packages.
//!
//! Zip and tar.gz archives are unpacked in-process on Windows. Other
//! platforms hand the archive to the system `unzip`/`tar`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::types::{ArchiveFormat, Platform};

// ============================================================================
// Archive Extraction
// ============================================================================

/// Extracts with the strategy appropriate for `platform`.
pub async fn extract(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
    platform: Platform,
) -> Result<()> {
    if platform.manages_tools() {
        let archive_path = archive_path.to_path_buf();
        let dest_dir = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || extract_archive(&archive_path, &dest_dir, format))
            .await
            .map_err(|e| Error::TaskFailed {
                task: "extract".to_string(),
                reason: e.to_string(),
            })?
    } else {
        extract_with_system_tool(archive_path, dest_dir, format).await
    }
}

/// Extracts an archive to a destination directory in-process.
///
/// Entries already written before a failure stay on disk.
///
/// # Errors
///
/// Fails on the first entry that cannot be extracted, or on an entry whose
/// path would land outside `dest_dir`.
pub fn extract_archive(archive_path: &Path, dest_dir: &Path, format: ArchiveFormat) -> Result<()> {
    info!(
        "Extracting {:?} archive {} to {}",
        format,
        archive_path.display(),
        dest_dir.display()
    );

    fs::create_dir_all(dest_dir).map_err(Error::io("create directory", dest_dir))?;

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, dest_dir),
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, dest_dir),
    }
}

/// Resolves an archive entry name below `dest_dir`.
///
/// Absolute names and names that climb out with `..` are rejected.
fn safe_join(dest_dir: &Path, name: &str) -> Result<PathBuf> {
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(Error::UnsafeEntry(name.to_string()));
    }

    let relative = Path::new(name);
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::UnsafeEntry(name.to_string()));
            }
        }
    }

    Ok(dest_dir.join(relative))
}

fn write_entry<R: Read>(reader: &mut R, dest_path: &Path) -> Result<()> {
    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent).map_err(Error::io("create directory", parent))?;
    }

    let mut outfile = File::create(dest_path).map_err(Error::io("create", dest_path))?;
    io::copy(reader, &mut outfile).map_err(Error::io("write", dest_path))?;
    outfile.flush().map_err(Error::io("flush", dest_path))?;
    Ok(())
}

// ============================================================================
// ZIP Extraction
// ============================================================================

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(Error::io("open", archive_path))?;

    let mut archive = zip::ZipArchive::new(file).map_err(|source| Error::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| Error::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let name = entry.name().to_string();
        let is_dir = entry.is_dir();
        let mode = entry.unix_mode();

        extract_zip_entry(&mut entry, &name, is_dir, mode, dest_dir)
            .map_err(|e| e.in_entry(&name))?;
    }

    debug!("ZIP extraction complete");
    Ok(())
}

#[allow(unused_variables)]
fn extract_zip_entry<R: Read>(
    entry: &mut R,
    name: &str,
    is_dir: bool,
    mode: Option<u32>,
    dest_dir: &Path,
) -> Result<()> {
    let dest_path = safe_join(dest_dir, name)?;

    if is_dir {
        fs::create_dir_all(&dest_path).map_err(Error::io("create directory", &dest_path))?;
        return Ok(());
    }

    write_entry(entry, &dest_path)?;

    #[cfg(unix)]
    set_unix_permissions(&dest_path, mode)?;

    Ok(())
}

// ============================================================================
// TAR.GZ Extraction
// ============================================================================

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(Error::io("open", archive_path))?;

    let reader = BufReader::new(file);
    let decoder = flate2::read::GzDecoder::new(reader);
    extract_tar(decoder, archive_path, dest_dir)
}

fn extract_tar<R: Read>(reader: R, archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(Error::io("read tar entries from", archive_path))?;

    for entry_result in entries {
        let mut entry = entry_result.map_err(Error::io("read tar entry from", archive_path))?;
        let entry_type = entry.header().entry_type();
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        // Only directories and regular files are unpacked.
        if !(entry_type.is_dir() || entry_type.is_file()) {
            warn!("Skipping non-regular tar entry {:?} ({:?})", name, entry_type);
            continue;
        }

        let dest_path = safe_join(dest_dir, &name).map_err(|e| e.in_entry(&name))?;

        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)
                .map_err(Error::io("create directory", &dest_path))
                .map_err(|e| e.in_entry(&name))?;
            continue;
        }

        write_entry(&mut entry, &dest_path).map_err(|e| e.in_entry(&name))?;

        #[cfg(unix)]
        {
            if let Ok(mode) = entry.header().mode() {
                set_unix_permissions(&dest_path, Some(mode)).map_err(|e| e.in_entry(&name))?;
            }
        }
    }

    debug!("TAR extraction complete");
    Ok(())
}

// ============================================================================
// System Tools
// ============================================================================

/// Extracts by running the system `unzip` or `tar`.
///
/// `unzip` exits with status 1 when it only had warnings; that counts as
/// success.
pub async fn extract_with_system_tool(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
) -> Result<()> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(Error::io("create directory", dest_dir))?;

    let (program, mut command) = match format {
        ArchiveFormat::Zip => {
            let mut cmd = Command::new("unzip");
            cmd.arg("-o").arg(archive_path).arg("-d").arg(dest_dir);
            ("unzip", cmd)
        }
        ArchiveFormat::TarGz => {
            let mut cmd = Command::new("tar");
            cmd.arg("xzf")
                .arg(archive_path)
                .arg("--directory")
                .arg(dest_dir);
            ("tar", cmd)
        }
    };

    info!(
        "Extracting {} with system {} into {}",
        archive_path.display(),
        program,
        dest_dir.display()
    );

    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;

    let warnings_only = format == ArchiveFormat::Zip && status.code() == Some(1);
    if status.success() || warnings_only {
        Ok(())
    } else {
        Err(Error::Process {
            program: program.to_string(),
            status,
        })
    }
}

// ============================================================================
// Unix Permissions
// ============================================================================

#[cfg(unix)]
fn set_unix_permissions(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if mode & 0o111 != 0 {
            let permissions = fs::Permissions::from_mode(mode | 0o755);
            fs::set_permissions(path, permissions).map_err(Error::io("set permissions on", path))?;
        }
    }

    Ok(())
}

/// Sets executable permission on a file (Unix only).
///
/// On Windows, this is a no-op.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(Error::io("read metadata of", path))?;

        let mut permissions = metadata.permissions();
        let current_mode = permissions.mode();
        permissions.set_mode(current_mode | 0o755);

        fs::set_permissions(path, permissions)
            .map_err(Error::io("set executable permission on", path))?;

        debug!("Set executable permission on {}", path.display());
    }

    Ok(())
}

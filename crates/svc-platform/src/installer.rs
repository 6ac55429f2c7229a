//! Filesystem side of installation: copying the binary into place and
//! writing/removing descriptor files.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::descriptor::ServiceDescriptor;
use crate::error::{InstallStage, Result, ServiceError, StageError};

/// Copy `source` to `dest`, truncating any existing file and leaving it
/// executable. A failed copy may leave a partial destination behind.
pub fn install_file(source: &Path, dest: &Path) -> Result<u64, StageError> {
    let mut input = File::open(source).map_err(|e| StageError::SourceUnreadable {
        path: source.to_path_buf(),
        source: e,
    })?;

    let copy_failed = |e: io::Error| StageError::CopyFailed {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }
    let mut output = options.open(dest).map_err(copy_failed)?;
    let bytes = io::copy(&mut input, &mut output).map_err(copy_failed)?;

    // The mode passed to open() only applies to newly created files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest, fs::Permissions::from_mode(0o755)).map_err(copy_failed)?;
    }

    Ok(bytes)
}

pub fn create_dir(path: &Path) -> Result<(), StageError> {
    fs::create_dir_all(path).map_err(|e| StageError::DirectoryCreateFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Create the install directory and copy the service binary into its `bin/`
/// subdirectory. Returns the installed binary path.
pub fn stage_binary(descriptor: &ServiceDescriptor, install_dir: &Path) -> Result<PathBuf> {
    create_dir(install_dir).map_err(ServiceError::install(InstallStage::CreateInstallDir))?;
    info!("install directory: {}", install_dir.display());

    let installed = descriptor.installed_binary_path(install_dir);
    if let Some(bin_dir) = installed.parent() {
        create_dir(bin_dir).map_err(ServiceError::install(InstallStage::CreateInstallDir))?;
    }

    if is_same_file(descriptor.executable_path(), &installed) {
        info!("binary already in install location");
        return Ok(installed);
    }

    let bytes = install_file(descriptor.executable_path(), &installed)
        .map_err(ServiceError::install(InstallStage::CopyBinary))?;
    info!("binary copied to {} ({} bytes)", installed.display(), bytes);
    Ok(installed)
}

pub fn write_descriptor(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| StageError::DescriptorWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
        .map_err(ServiceError::install(InstallStage::WriteDescriptor))?;
    info!("service descriptor written to {}", path.display());
    Ok(())
}

pub fn remove_descriptor(path: &Path) -> Result<(), StageError> {
    fs::remove_file(path).map_err(|e| StageError::DescriptorRemoveFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn remove_dir_tree(path: &Path) -> Result<(), StageError> {
    fs::remove_dir_all(path).map_err(|e| StageError::DirectoryRemoveFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

// Copying a file onto itself with truncate semantics would empty it.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_for(exe: &Path) -> ServiceDescriptor {
        ServiceDescriptor::new(exe, "demo", "Demo service").unwrap()
    }

    #[test]
    fn install_file_copies_bytes_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::write(&src, b"new").unwrap();
        fs::write(&dest, b"much longer old content").unwrap();

        let copied = install_file(&src, &dest).unwrap();

        assert_eq!(copied, 3);
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn install_file_leaves_destination_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::write(&src, b"#!/bin/sh\n").unwrap();
        fs::write(&dest, b"").unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o600)).unwrap();

        install_file(&src, &dest).unwrap();

        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn install_file_missing_source_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = install_file(&dir.path().join("missing"), &dir.path().join("dest")).unwrap_err();
        assert!(matches!(err, StageError::SourceUnreadable { .. }));
        assert!(!dir.path().join("dest").exists());
    }

    #[test]
    fn install_file_into_missing_directory_fails_copy() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::write(&src, b"x").unwrap();

        let err = install_file(&src, &dir.path().join("nope").join("dest")).unwrap_err();
        assert!(matches!(err, StageError::CopyFailed { .. }));
    }

    #[test]
    fn stage_binary_places_copy_under_bin() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("hello-service");
        fs::write(&exe, b"\x7fELF binary bytes").unwrap();
        let install_dir = dir.path().join("opt").join("demo");

        let installed = stage_binary(&descriptor_for(&exe), &install_dir).unwrap();

        assert_eq!(installed, install_dir.join("bin").join("hello-service"));
        assert_eq!(fs::read(&installed).unwrap(), fs::read(&exe).unwrap());
    }

    #[test]
    fn stage_binary_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("svc");
        fs::write(&exe, b"v1").unwrap();
        let install_dir = dir.path().join("install");
        let desc = descriptor_for(&exe);

        stage_binary(&desc, &install_dir).unwrap();
        fs::write(&exe, b"v2").unwrap();
        let installed = stage_binary(&desc, &install_dir).unwrap();

        assert_eq!(fs::read(installed).unwrap(), b"v2");
    }

    #[test]
    fn stage_binary_skips_copy_onto_itself() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join("install");
        fs::create_dir_all(install_dir.join("bin")).unwrap();
        let exe = install_dir.join("bin").join("svc");
        fs::write(&exe, b"keep me").unwrap();

        let installed = stage_binary(&descriptor_for(&exe), &install_dir).unwrap();

        assert_eq!(installed, exe);
        assert_eq!(fs::read(&exe).unwrap(), b"keep me");
    }

    #[test]
    fn stage_binary_reports_copy_stage_for_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let desc = descriptor_for(&dir.path().join("missing"));

        let err = stage_binary(&desc, &dir.path().join("install")).unwrap_err();
        assert_eq!(err.install_stage(), Some(InstallStage::CopyBinary));
    }

    #[test]
    fn write_descriptor_failure_is_write_stage() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_descriptor(&dir.path().join("missing").join("x.service"), "x").unwrap_err();
        assert_eq!(err.install_stage(), Some(InstallStage::WriteDescriptor));
    }
}

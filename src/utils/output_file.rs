use std::io;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

/// Creates the staging file for an output that is later persisted over its
/// final name. The file is created with mode `0666` filtered by the process
/// umask, the same mode a plain `File::create` would give it, rather than the
/// owner-only mode of `NamedTempFile::new_in`.
pub fn staging_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    builder.prefix(".deeppass-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

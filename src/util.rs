//! Filesystem helpers shared by configuration loading and image uploads.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir, fs_utf8::File};

/// Splits a path into the directory to open with ambient authority and the
/// path to resolve relative to it.
fn split_ambient(path: &Utf8Path) -> Result<(&Utf8Path, &Utf8Path), String> {
    if path.is_absolute() {
        let parent = path
            .parent()
            .ok_or_else(|| format!("path has no parent directory: {path}"))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| format!("path has no file name: {path}"))?;
        Ok((parent, Utf8Path::new(file_name)))
    } else {
        Ok((Utf8Path::new("."), path))
    }
}

pub(crate) fn read_to_string_ambient(path: &Utf8Path) -> Result<String, String> {
    let (dir_path, file_path) = split_ambient(path)?;
    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.read_to_string(file_path).map_err(|err| err.to_string())
}

pub(crate) fn open_ambient(path: &Utf8Path) -> Result<File, String> {
    let (dir_path, file_path) = split_ambient(path)?;
    let dir =
        Dir::open_ambient_dir(dir_path, ambient_authority()).map_err(|err| err.to_string())?;
    dir.open(file_path).map_err(|err| err.to_string())
}

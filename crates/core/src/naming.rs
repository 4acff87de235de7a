//! Output file naming convention.
//!
//! Convention: `{output_dir}/{stem}{suffix}{.ext}`
//!
//! - `stem` = input file name without its last extension
//! - `suffix` = [`TransformKind::suffix`]
//! - `.ext` = the input's last extension, omitted if the input has none
//!
//! The result depends only on the input path and the transform kind. Two
//! inputs from different directories that share a file name map to the
//! same output path; no collision detection is performed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::transform::TransformKind;

/// Output file name (no directory) for `input` under `kind`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use pixbatch_core::naming::output_file_name;
/// use pixbatch_core::transform::TransformKind;
///
/// let name = output_file_name(Path::new("/photos/cat.png"), TransformKind::Grayscale).unwrap();
/// assert_eq!(name, "cat_gray.png");
/// ```
pub fn output_file_name(input: &Path, kind: TransformKind) -> Result<OsString, CoreError> {
    let stem = input.file_stem().ok_or_else(|| {
        CoreError::Validation(format!("Input path has no file name: {}", input.display()))
    })?;

    let mut name = OsString::with_capacity(stem.len() + kind.suffix().len() + 8);
    name.push(stem);
    name.push(kind.suffix());
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    Ok(name)
}

/// Full output path for `input` under `kind` inside `output_dir`.
pub fn output_path(
    output_dir: &Path,
    input: &Path,
    kind: TransformKind,
) -> Result<PathBuf, CoreError> {
    Ok(output_dir.join(output_file_name(input, kind)?))
}

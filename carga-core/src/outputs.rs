use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// File name to content, as returned by a summary hook.
pub type SummaryOutputs = Vec<(String, String)>;

fn sanitize_relative_output_path(rel: &str) -> Result<PathBuf> {
    let invalid = || Error::InvalidOutputPath(rel.to_string());

    let path = Path::new(rel);
    if path.is_absolute() {
        return Err(invalid());
    }

    let mut clean = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::Normal(p) => clean.push(p),
            _ => return Err(invalid()),
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(invalid());
    }
    Ok(clean)
}

/// Writes summary hook outputs under `base_dir`. Paths must be relative and may not contain `..`.
/// Returns the written paths.
pub fn write_output_files(base_dir: &Path, files: &[(String, String)]) -> Result<Vec<PathBuf>> {
    // Validate everything first so a bad name does not leave a partial set behind.
    let targets = files
        .iter()
        .map(|(rel, content)| Ok((base_dir.join(sanitize_relative_output_path(rel)?), content)))
        .collect::<Result<Vec<_>>>()?;

    let mut written = Vec::with_capacity(targets.len());
    for (path, content) in targets {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote output file");
        written.push(path);
    }
    Ok(written)
}

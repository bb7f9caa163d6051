use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("section marker `{0}` not found")]
    MarkerNotFound(String),
    #[error("section marker `{marker}` found {count} times, expected once")]
    DuplicateMarker { marker: String, count: usize },
    #[error("section marker `{0}` has no heading prefix (e.g. `## `)")]
    MalformedMarker(String),
}

/// Heading prefix of a marker line: everything up to and including the first whitespace.
fn level_prefix(marker: &str) -> Option<&str> {
    let end = marker.find(char::is_whitespace)?;
    let ws_len = marker[end..].chars().next()?.len_utf8();
    Some(&marker[..end + ws_len])
}

fn strip_line_ending(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

/// Replace the body of the section starting at the `marker` line.
///
/// The body runs up to the next line with the same heading prefix, or to the
/// end of the document. Text outside the body is kept byte for byte.
pub fn patch_section(document: &str, marker: &str, body: &[String]) -> Result<String, PatchError> {
    let prefix = level_prefix(marker).ok_or_else(|| PatchError::MalformedMarker(marker.to_string()))?;
    let lines: Vec<&str> = document.split_inclusive('\n').collect();

    let hits: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| strip_line_ending(line) == marker)
        .map(|(i, _)| i)
        .collect();
    let start = match hits.as_slice() {
        [] => return Err(PatchError::MarkerNotFound(marker.to_string())),
        [single] => *single,
        _ => {
            return Err(PatchError::DuplicateMarker {
                marker: marker.to_string(),
                count: hits.len(),
            })
        }
    };

    let end = lines[start + 1..]
        .iter()
        .position(|line| line.starts_with(prefix))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    let mut patched = String::with_capacity(document.len());
    for line in &lines[..=start] {
        patched.push_str(line);
    }
    if !patched.ends_with('\n') {
        patched.push('\n');
    }
    for line in body {
        patched.push_str(line);
        patched.push('\n');
    }
    for line in &lines[end..] {
        patched.push_str(line);
    }
    Ok(patched)
}

/// Patch the section of the file at `path` in place.
///
/// The new content goes to a temporary file next to `path` that is then
/// renamed over it, so the file is either fully patched or untouched.
pub fn patch_file(path: &Path, marker: &str, body: &[String]) -> Result<()> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let patched = patch_section(&document, marker, body)
        .with_context(|| format!("Cannot patch {}", path.display()))?;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp_file = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    std::io::Write::write_all(&mut temp_file, patched.as_bytes())?;
    // The temp file is created 0600; keep the README's own mode.
    let permissions = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions();
    temp_file.as_file().set_permissions(permissions)?;
    temp_file
        .persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

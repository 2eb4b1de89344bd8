//! Output directory resolution and deterministic file naming for
//! synthesized audio.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::api::types::AudioFormat;
use crate::error::SpeakError;

/// Resolves, creates, and validates the directory audio files are written
/// to. With no directory the platform `Desktop` under the home directory is
/// used; relative paths resolve under `storage_path` when configured.
pub fn make_output_path(
    output_dir: Option<&str>,
    storage_path: Option<&Path>,
) -> Result<PathBuf, SpeakError> {
    let home = dirs::home_dir().ok_or_else(|| SpeakError::NotWriteable {
        path: "~".to_string(),
        reason: "home directory not found".to_string(),
    })?;
    resolve_with_home(output_dir, storage_path, &home)
}

fn resolve_with_home(
    output_dir: Option<&str>,
    storage_path: Option<&Path>,
    home: &Path,
) -> Result<PathBuf, SpeakError> {
    let target = match output_dir {
        None => home.join("Desktop"),
        Some(dir) => {
            let dir = Path::new(dir);
            if dir.is_absolute() {
                dir.to_path_buf()
            } else {
                match storage_path {
                    Some(base) => base.join(dir),
                    None => home.join("Desktop").join(dir),
                }
            }
        }
    };

    fs::create_dir_all(&target).map_err(|e| SpeakError::NotWriteable {
        path: target.display().to_string(),
        reason: e.to_string(),
    })?;
    ensure_writeable(&target)?;
    debug!(path = %target.display(), "Resolved output directory");
    Ok(target)
}

/// Probes writability with a real write-and-delete rather than inspecting
/// permission bits, which miss mount options and ACLs.
fn ensure_writeable(dir: &Path) -> Result<(), SpeakError> {
    let probe = dir.join(format!(".write_test_{}", Uuid::new_v4()));
    fs::write(&probe, b"probe").map_err(|e| SpeakError::NotWriteable {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

/// Deterministic output file path: a slug of the spoken text plus the audio
/// extension. Repeating a request overwrites the previous file.
pub fn output_file_path(dir: &Path, text: &str, format: AudioFormat) -> PathBuf {
    dir.join(format!("{}.{}", slugify(text), format.extension()))
}

fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut last_underscore = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore && !slug.is_empty() {
            slug.push('_');
            last_underscore = true;
        }
        if slug.len() >= 60 {
            break;
        }
    }
    let slug = slug.trim_matches('_').to_string();
    if slug.is_empty() {
        "speech".to_string()
    } else {
        slug
    }
}

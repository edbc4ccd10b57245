/// Survey folder listing
///
/// Only the top level of the folder is scanned. Order is whatever the
/// filesystem enumerates unless sorting is requested.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{InspectError, Result};

/// Photo extensions accepted in a survey folder (matched case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "bmp"];

/// Check if a path looks like a survey photo by extension
pub fn is_survey_image(path: &Path) -> bool {
    match path.extension() {
        Some(extension) => {
            let ext = extension.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// List the photos of a survey folder
pub fn list_survey_images(folder: &Path, sort: bool) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(InspectError::io(
            folder,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.into_path()),
            Err(e) => {
                tracing::warn!("⚠️  Skipping unreadable entry in {}: {}", folder.display(), e);
                None
            }
        })
        .filter(|path| path.is_file() && is_survey_image(path))
        .collect();

    if sort {
        images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    tracing::info!("🔍 Found {} images in {}", images.len(), folder.display());
    Ok(images)
}

//! Loads pictures and captions from disk.

use std::path::Path;

use tokio::fs;
use tracing::{debug, info, warn};

use super::{MediaError, MediaPool, Picture};

/// File extensions accepted as pictures.
pub const PICTURE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Load every picture in `pictures_dir` and, if given, the captions file.
///
/// Unreadable picture files are skipped. An empty result is an error since
/// there would be nothing to upload.
pub async fn load_media_pool(
    pictures_dir: &Path,
    captions_file: Option<&Path>,
) -> Result<MediaPool, MediaError> {
    let captions = match captions_file {
        Some(path) => {
            let text = fs::read_to_string(path).await.map_err(|e| MediaError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            let captions = split_captions(&text);
            debug!(count = captions.len(), "Captions loaded from {:?}", path);
            captions
        }
        None => Vec::new(),
    };

    let io_err = |e: std::io::Error| MediaError::Io {
        path: pictures_dir.to_path_buf(),
        source: e,
    };

    let mut names = Vec::new();
    let mut entries = fs::read_dir(pictures_dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_picture(&name) {
            names.push(name);
        }
    }
    names.sort();

    info!("Loading pictures into memory...");
    let total = names.len();
    let mut pictures = Vec::with_capacity(total);
    for name in names {
        let path = pictures_dir.join(&name);
        match fs::read(&path).await {
            Ok(content) => pictures.push(Picture::new(name, content)),
            Err(e) => warn!("Failed to load picture {:?}: {}", path, e),
        }
    }
    info!("{}/{} pictures loaded", pictures.len(), total);

    if pictures.is_empty() {
        return Err(MediaError::NoPictures(pictures_dir.to_path_buf()));
    }

    Ok(MediaPool::new(pictures, captions))
}

/// Captions are separated by blank lines.
pub fn split_captions(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_picture(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PICTURE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

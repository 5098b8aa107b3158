//! Discovery module: find image files in the configured directory

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::{IMAGE_EXTENSIONS, PicsearchError, Result};

/// Files found under the images directory.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Supported image files, ordered by path
    pub images: Vec<PathBuf>,
    /// Regular files skipped because of their extension
    pub skipped: usize,
}

/// Check if a path has a supported image extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List image files in `dir`.
///
/// Only the top level is read unless `recursive` is set. Hidden files are
/// skipped, symlinks are resolved, and ignore files are not consulted.
pub fn find_images(dir: &Path, recursive: bool) -> Result<Discovered> {
    if !dir.is_dir() {
        return Err(PicsearchError::ImagesDirNotFound(dir.to_path_buf()));
    }

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(true)
        .follow_links(true)
        .max_depth(if recursive { None } else { Some(1) })
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut discovered = Discovered::default();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        if is_image(entry.path()) {
            discovered.images.push(entry.into_path());
        } else {
            discovered.skipped += 1;
        }
    }

    Ok(discovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a/cat.jpg")));
        assert!(is_image(Path::new("DOG.JPEG")));
        assert!(is_image(Path::new("x.Png")));
        assert!(is_image(Path::new("y.webp")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("noext")));
    }

    #[test]
    fn test_find_images_flat() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("b.png"), b"x").unwrap();
        fs::write(temp.path().join("a.jpg"), b"x").unwrap();
        fs::write(temp.path().join("readme.md"), b"x").unwrap();
        fs::write(temp.path().join(".hidden.jpg"), b"x").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested").join("c.webp"), b"x").unwrap();

        let found = find_images(temp.path(), false).unwrap();
        let names: Vec<_> = found
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["a.jpg", "b.png"]);
        assert_eq!(found.skipped, 1);
    }

    #[test]
    fn test_find_images_recursive() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("a.jpg"), b"x").unwrap();
        fs::create_dir(temp.path().join("nested")).unwrap();
        fs::write(temp.path().join("nested").join("c.webp"), b"x").unwrap();

        let found = find_images(temp.path(), true).unwrap();
        assert_eq!(found.images.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_image_included() {
        let source = tempfile::tempdir().unwrap();
        let target = source.path().join("cat.jpg");
        fs::write(&target, b"x").unwrap();

        let temp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(&target, temp.path().join("cat.jpg")).unwrap();
        std::os::unix::fs::symlink(source.path(), temp.path().join("linked_dir")).unwrap();

        let found = find_images(temp.path(), false).unwrap();
        assert_eq!(found.images.len(), 1);
        assert_eq!(found.images[0].file_name().unwrap(), "cat.jpg");
        assert_eq!(found.skipped, 0);
    }

    #[test]
    fn test_empty_dir() {
        let temp = tempfile::tempdir().unwrap();
        let found = find_images(temp.path(), false).unwrap();
        assert!(found.images.is_empty());
        assert_eq!(found.skipped, 0);
    }

    #[test]
    fn test_missing_dir() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope");
        let result = find_images(&missing, false);
        assert!(matches!(result, Err(PicsearchError::ImagesDirNotFound(_))));
    }
}

//! Directory walking implementation using walkdir.

use super::{filter::ImageFilter, PhotoFile, PhotoScanner, ScanResult};
use crate::error::ScanError;
use crate::events::{EventSender, ScanEvent, ScanProgress};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub follow_symlinks: bool,
    /// Descend into dot-directories and accept dotfiles
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Extensions to accept instead of the defaults
    pub extensions: Option<Vec<String>>,
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: ImageFilter,
}

impl WalkDirScanner {
    pub fn new(config: ScanConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self { config, filter }
    }

    fn walk_error(error: walkdir::Error) -> ScanError {
        let path = error.path().map(Path::to_path_buf).unwrap_or_default();

        if error.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
            ScanError::PermissionDenied { path }
        } else {
            ScanError::ReadDirectory {
                path,
                source: std::io::Error::other(error.to_string()),
            }
        }
    }

    fn scan_directory(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<(Vec<PhotoFile>, Vec<ScanError>), ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut photos = Vec::new();
        let mut errors = Vec::new();
        let mut directories_scanned = 0;

        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        // Prune hidden directories instead of walking and discarding them
        let entries = walker
            .into_iter()
            .filter_entry(|entry: &DirEntry| {
                entry.depth() == 0 || !self.filter.is_hidden(entry.path())
            });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = Self::walk_error(e);
                    warn!(%error, "skipping unreadable entry");
                    events.scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    });
                    errors.push(error);
                    continue;
                }
            };

            let path = entry.path();

            if entry.file_type().is_dir() {
                directories_scanned += 1;
                events.scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned,
                    photos_found: photos.len(),
                    current_path: path.to_path_buf(),
                }));
                continue;
            }

            if !self.filter.should_include(path) {
                continue;
            }

            match fs::metadata(path) {
                Ok(metadata) => {
                    events.scan(ScanEvent::PhotoFound {
                        path: path.to_path_buf(),
                    });
                    photos.push(PhotoFile {
                        path: path.to_path_buf(),
                        size: metadata.len(),
                        modified: metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
                        format: self.filter.get_format(path),
                    });
                }
                Err(source) => {
                    let error = ScanError::ReadDirectory {
                        path: path.to_path_buf(),
                        source,
                    };
                    events.scan(ScanEvent::Error {
                        path: path.to_path_buf(),
                        message: error.to_string(),
                    });
                    errors.push(error);
                }
            }
        }

        Ok((photos, errors))
    }
}

impl PhotoScanner for WalkDirScanner {
    fn scan(&self, paths: &[PathBuf]) -> Result<ScanResult, ScanError> {
        self.scan_with_events(paths, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.scan(ScanEvent::Started {
            paths: paths.to_vec(),
        });

        let mut all_photos = Vec::new();
        let mut all_errors = Vec::new();

        for path in paths {
            match self.scan_directory(path, events) {
                Ok((photos, errors)) => {
                    all_photos.extend(photos);
                    all_errors.extend(errors);
                }
                Err(e) => {
                    warn!(error = %e, "skipping folder");
                    all_errors.push(e);
                }
            }
        }

        // Stable order so repeated imports add items in the same sequence
        all_photos.sort_by(|a, b| a.path.cmp(&b.path));
        all_photos.dedup_by(|a, b| a.path == b.path);

        info!(
            photos = all_photos.len(),
            errors = all_errors.len(),
            "scan finished"
        );
        events.scan(ScanEvent::Completed {
            total_photos: all_photos.len(),
        });

        Ok(ScanResult {
            photos: all_photos,
            errors: all_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::ImageFormat;
    use crate::events::{Event, EventChannel};
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_photo(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        path
    }

    fn scan(dir: &TempDir, config: ScanConfig) -> ScanResult {
        WalkDirScanner::new(config)
            .scan(&[dir.path().to_path_buf()])
            .unwrap()
    }

    #[test]
    fn empty_directory_has_no_photos() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan(&temp_dir, ScanConfig::default());

        assert!(result.photos.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn finds_supported_formats_only() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "mug.jpg");
        create_test_photo(temp_dir.path(), "lamp.png");
        create_test_photo(temp_dir.path(), "phone.heic");
        File::create(temp_dir.path().join("notes.txt")).unwrap();

        let result = scan(&temp_dir, ScanConfig::default());

        let formats: Vec<_> = result.photos.iter().map(|p| p.format).collect();
        assert_eq!(formats, vec![ImageFormat::Png, ImageFormat::Jpeg]);
    }

    #[test]
    fn results_are_sorted_by_path() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a");
        fs::create_dir(&nested).unwrap();
        create_test_photo(temp_dir.path(), "z.jpg");
        create_test_photo(&nested, "b.jpg");
        create_test_photo(temp_dir.path(), "b.jpg");

        let result = scan(&temp_dir, ScanConfig::default());
        let paths: Vec<_> = result.photos.iter().map(|p| p.path.clone()).collect();

        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn hidden_directories_are_pruned() {
        let temp_dir = TempDir::new().unwrap();
        let hidden = temp_dir.path().join(".thumbnails");
        fs::create_dir(&hidden).unwrap();
        create_test_photo(&hidden, "cached.jpg");
        create_test_photo(temp_dir.path(), "visible.jpg");
        create_test_photo(temp_dir.path(), ".hidden.jpg");

        let result = scan(&temp_dir, ScanConfig::default());
        assert_eq!(result.photos.len(), 1);
        assert!(result.photos[0].path.ends_with("visible.jpg"));

        let config = ScanConfig {
            include_hidden: true,
            ..Default::default()
        };
        assert_eq!(scan(&temp_dir, config).photos.len(), 3);
    }

    #[test]
    fn max_depth_limits_descent() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("deep");
        fs::create_dir(&nested).unwrap();
        create_test_photo(temp_dir.path(), "top.jpg");
        create_test_photo(&nested, "below.jpg");

        let config = ScanConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        assert_eq!(scan(&temp_dir, config).photos.len(), 1);
    }

    #[test]
    fn missing_directory_is_recorded_not_fatal() {
        let scanner = WalkDirScanner::new(ScanConfig::default());
        let result = scanner
            .scan(&[PathBuf::from("/nonexistent/path/12345")])
            .unwrap();

        assert!(matches!(
            result.errors.as_slice(),
            [ScanError::DirectoryNotFound { .. }]
        ));
    }

    #[test]
    fn emits_start_and_completion() {
        let temp_dir = TempDir::new().unwrap();
        create_test_photo(temp_dir.path(), "one.jpg");
        let (sender, receiver) = EventChannel::new();

        WalkDirScanner::new(ScanConfig::default())
            .scan_with_events(&[temp_dir.path().to_path_buf()], &sender)
            .unwrap();

        let events = receiver.drain();
        assert!(matches!(events.first(), Some(Event::Scan(ScanEvent::Started { .. }))));
        assert!(matches!(
            events.last(),
            Some(Event::Scan(ScanEvent::Completed { total_photos: 1 }))
        ));
    }
}

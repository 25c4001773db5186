//! # Indexer Module
//!
//! Bulk-imports photo folders into the catalogue.
//!
//! ## Workflow
//! 1. **Scan** - walk the folders for supported images
//! 2. **Fingerprint** - in parallel: decode, letterbox into the capture
//!    square, extract the fingerprint
//! 3. **Store** - add every fingerprinted photo in one batch
//!
//! Photos that fail to decode are reported and skipped; the run only fails
//! on configuration or storage errors.

use crate::core::capture::{capture, CaptureConfig};
use crate::core::catalog::{CatalogItem, CatalogStore, NewItem};
use crate::core::extractor::{Extraction, FastDecoder, FingerprintConfig, FingerprintExtractor};
use crate::core::fingerprint::Fingerprint;
use crate::core::scanner::{PhotoFile, PhotoScanner, ScanConfig, WalkDirScanner};
use crate::error::{CatalogError, ExtractError};
use crate::events::{null_sender, EventSender, IndexEvent, IndexProgress, IndexSummary};
use image::DynamicImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// A photo ready to be committed: its fingerprint and stored thumbnail
#[derive(Debug, Clone)]
pub struct PreparedPhoto {
    pub fingerprint: Fingerprint,
    /// JPEG data URL of the letterboxed capture
    pub thumbnail: String,
    /// What the extractor sampled
    pub extraction: Extraction,
}

/// Normalise a decoded photo the same way a camera capture is normalised,
/// then fingerprint it
pub fn prepare_image(
    image: &DynamicImage,
    extractor: &dyn FingerprintExtractor,
    capture_config: &CaptureConfig,
) -> Result<PreparedPhoto, ExtractError> {
    let captured = capture(image, capture_config)?;
    let extraction = extractor.extract(&captured.as_dynamic())?;

    Ok(PreparedPhoto {
        fingerprint: extraction.fingerprint.clone(),
        thumbnail: captured.data_url,
        extraction,
    })
}

/// Decode a file and prepare it
pub fn prepare_file(
    path: &Path,
    extractor: &dyn FingerprintExtractor,
    capture_config: &CaptureConfig,
) -> Result<PreparedPhoto, ExtractError> {
    let image = FastDecoder::decode(path)?;
    prepare_image(&image, extractor, capture_config)
}

/// Result of an indexing run
#[derive(Debug)]
pub struct IndexResult {
    /// Items added, in scan order
    pub items: Vec<CatalogItem>,
    /// Photos found by the scanner
    pub total_photos: usize,
    /// Non-fatal problems, one line each
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Configuration for an indexing run
#[derive(Debug, Clone, Default)]
pub struct IndexerConfig {
    pub paths: Vec<PathBuf>,
    pub fingerprint: FingerprintConfig,
    pub capture: CaptureConfig,
    pub scan_config: ScanConfig,
    /// Tags given to every imported item
    pub tags: Vec<String>,
    /// Store the capture thumbnail with each item
    pub store_thumbnails: bool,
}

/// Builder for indexer configuration
pub struct IndexerBuilder {
    config: IndexerConfig,
}

impl IndexerBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexerConfig {
                store_thumbnails: true,
                ..Default::default()
            },
        }
    }

    /// Folders to import
    pub fn paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.paths = paths;
        self
    }

    pub fn fingerprint(mut self, config: FingerprintConfig) -> Self {
        self.config.fingerprint = config;
        self
    }

    pub fn capture(mut self, config: CaptureConfig) -> Self {
        self.config.capture = config;
        self
    }

    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.config.tags = tags;
        self
    }

    pub fn store_thumbnails(mut self, store: bool) -> Self {
        self.config.store_thumbnails = store;
        self
    }

    pub fn build(self) -> Indexer {
        Indexer {
            config: self.config,
        }
    }
}

impl Default for IndexerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Imports folders of photos into a catalogue
pub struct Indexer {
    config: IndexerConfig,
}

impl Indexer {
    pub fn builder() -> IndexerBuilder {
        IndexerBuilder::new()
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Run without events
    pub fn run(&self, catalog: &dyn CatalogStore) -> Result<IndexResult, CatalogError> {
        self.run_with_events(catalog, &null_sender())
    }

    /// Run with event reporting
    pub fn run_with_events(
        &self,
        catalog: &dyn CatalogStore,
        events: &EventSender,
    ) -> Result<IndexResult, CatalogError> {
        let start_time = Instant::now();

        // Fail on a bad size before touching the disk
        let extractor = self.config.fingerprint.clone().build()?;

        let scanner = WalkDirScanner::new(self.config.scan_config.clone());
        let scan_result = scanner.scan_with_events(&self.config.paths, events)?;
        let mut errors: Vec<String> = scan_result.errors.iter().map(|e| e.to_string()).collect();

        let photos = scan_result.photos;
        let total_photos = photos.len();

        events.index(IndexEvent::Started { total_photos });

        let completed = AtomicUsize::new(0);

        // par_iter + collect keeps scan order
        let prepared: Vec<(&PhotoFile, Result<PreparedPhoto, ExtractError>)> = photos
            .par_iter()
            .map(|photo| {
                let result = prepare_file(&photo.path, extractor.as_ref(), &self.config.capture);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                if let Err(e) = &result {
                    warn!(path = %photo.path.display(), error = %e, "skipping photo");
                    events.index(IndexEvent::Error {
                        path: photo.path.clone(),
                        message: e.to_string(),
                    });
                }
                events.index(IndexEvent::Progress(IndexProgress {
                    completed: done,
                    total: total_photos,
                    current_path: photo.path.clone(),
                }));

                (photo, result)
            })
            .collect();

        let mut new_items = Vec::new();
        let mut sources = Vec::new();
        for (photo, result) in prepared {
            match result {
                Ok(ready) => {
                    new_items.push(self.new_item(photo, ready));
                    sources.push(photo.path.clone());
                }
                Err(e) => errors.push(format!("{}: {}", photo.path.display(), e)),
            }
        }
        let failed = total_photos - new_items.len();

        let items = catalog.add_batch(new_items)?;
        for (item, path) in items.iter().zip(sources) {
            events.index(IndexEvent::PhotoIndexed {
                path,
                item_id: item.id.to_string(),
            });
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        let summary = IndexSummary {
            total_photos,
            indexed: items.len(),
            failed,
            duration_ms,
        };
        info!(
            indexed = summary.indexed,
            failed = summary.failed,
            duration_ms,
            "index finished"
        );
        events.index(IndexEvent::Completed { summary });

        Ok(IndexResult {
            items,
            total_photos,
            errors,
            duration_ms,
        })
    }

    fn new_item(&self, photo: &PhotoFile, ready: PreparedPhoto) -> NewItem {
        let mut item = NewItem::new(photo.display_name(), ready.fingerprint)
            .photo_url(photo.path.display().to_string())
            .tags(self.config.tags.clone());
        if self.config.store_thumbnails {
            item = item.thumbnail(ready.thumbnail);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::InMemoryCatalog;
    use crate::core::fingerprint::FingerprintKind;
    use crate::events::{Event, EventChannel};
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn write_gradient(dir: &Path, name: &str, reversed: bool) -> PathBuf {
        let img = ImageBuffer::from_fn(64, 48, |x, _| {
            let v = (x * 4) as u8;
            let v = if reversed { 255 - v } else { v };
            Rgb([v, v, v])
        });
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn builder_defaults() {
        let indexer = Indexer::builder().build();
        assert!(indexer.config().store_thumbnails);
        assert!(indexer.config().paths.is_empty());
    }

    #[test]
    fn indexes_folder_into_catalog() {
        let temp_dir = TempDir::new().unwrap();
        write_gradient(temp_dir.path(), "a-rising.png", false);
        write_gradient(temp_dir.path(), "b-falling.png", true);

        let catalog = InMemoryCatalog::new();
        let result = Indexer::builder()
            .paths(vec![temp_dir.path().to_path_buf()])
            .tags(vec!["imported".to_string()])
            .build()
            .run(&catalog)
            .unwrap();

        assert_eq!(result.total_photos, 2);
        assert!(result.errors.is_empty());

        let items = catalog.list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "a-rising");
        assert_eq!(items[0].tags, vec!["imported"]);
        assert_eq!(items[0].fingerprint.kind(), FingerprintKind::DHash);
        assert_ne!(items[0].fingerprint, items[1].fingerprint);
        assert!(items[0]
            .thumbnail
            .as_deref()
            .is_some_and(|t| t.starts_with("data:image/jpeg;base64,")));
    }

    #[test]
    fn broken_photos_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write_gradient(temp_dir.path(), "good.png", false);
        std::fs::write(temp_dir.path().join("broken.jpg"), b"not a jpeg").unwrap();

        let catalog = InMemoryCatalog::new();
        let (sender, receiver) = EventChannel::new();
        let result = Indexer::builder()
            .paths(vec![temp_dir.path().to_path_buf()])
            .store_thumbnails(false)
            .build()
            .run_with_events(&catalog, &sender)
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.items[0].thumbnail.is_none());

        let summary = receiver.drain().into_iter().find_map(|e| match e {
            Event::Index(IndexEvent::Completed { summary }) => Some(summary),
            _ => None,
        });
        assert_eq!(summary.map(|s| (s.indexed, s.failed)), Some((1, 1)));
    }

    #[test]
    fn invalid_size_fails_before_scanning() {
        let catalog = InMemoryCatalog::new();
        let result = Indexer::builder()
            .paths(vec![PathBuf::from("/nonexistent")])
            .fingerprint(FingerprintConfig::new().size(2))
            .build()
            .run(&catalog);

        assert!(matches!(
            result,
            Err(CatalogError::Extract(ExtractError::InvalidSize { .. }))
        ));
    }

    #[test]
    fn prepared_thumbnail_is_square_capture() {
        let extractor = FingerprintConfig::new().build().unwrap();
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(30, 10, Rgb([200, 10, 10])));

        let ready = prepare_image(&image, extractor.as_ref(), &CaptureConfig::default()).unwrap();

        assert_eq!(ready.fingerprint.len(), 64);
        let thumb = FastDecoder::decode_data_url(&ready.thumbnail).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (256, 256));
    }
}

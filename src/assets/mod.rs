//! Embedded image extraction and storage

mod classify;

pub use classify::{assign_roles, classify, AssetRoles};

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::pdf::{DocumentModel, EmbeddedImage, ImageEncoding};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// An embedded image written to the photo directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAsset {
    /// Discovery order over the whole document
    pub ordinal: usize,
    /// 1-based page the image was found on
    pub page: usize,
    pub bytes: Vec<u8>,
    pub format: ImageEncoding,
    pub path: PathBuf,
}

/// Photo and signature directories.
///
/// Every file is created with `create_new` under a fresh uuid v4 name, so
/// concurrent writers never overwrite each other.
#[derive(Debug)]
pub struct AssetStore {
    photo_dir: PathBuf,
    signature_dir: PathBuf,
}

impl AssetStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            photo_dir: config.photo_dir.clone(),
            signature_dir: config.signature_dir.clone(),
        }
    }

    pub fn photo_dir(&self) -> &Path {
        &self.photo_dir
    }

    pub fn signature_dir(&self) -> &Path {
        &self.signature_dir
    }

    /// Create both directories if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.photo_dir, &self.signature_dir] {
            fs::create_dir_all(dir).map_err(|source| Error::AssetIo {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Random name prefix for a new file
    pub fn unique_name(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// Write image `index` (1-based) of `page` (1-based) to the photo directory
    pub fn write_image(&self, page: usize, index: usize, image: &EmbeddedImage) -> Result<PathBuf> {
        let file_name = format!(
            "{}_{}_img_{}.{}",
            self.unique_name(),
            page,
            index,
            image.extension()
        );
        let path = self.photo_dir.join(file_name);
        write_new(&path, &image.bytes)?;
        Ok(path)
    }

    /// Move `from` into the signature directory as `<uuid>_signature.<ext>`
    pub fn relocate_signature(&self, from: &Path) -> Result<PathBuf> {
        let extension = from
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let target = self
            .signature_dir
            .join(format!("{}_signature.{}", self.unique_name(), extension));

        move_no_clobber(from, &target)?;
        Ok(target)
    }
}

/// Move `from` to `to`, failing when `to` already exists.
///
/// A hard link claims `to` atomically; when linking is impossible (other
/// filesystem, no link support) the bytes are copied into a `create_new`
/// file instead. The source is removed last.
fn move_no_clobber(from: &Path, to: &Path) -> Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => {}
        Err(source) if matches!(source.kind(), ErrorKind::AlreadyExists | ErrorKind::NotFound) => {
            return Err(Error::AssetIo {
                path: from.to_path_buf(),
                source,
            });
        }
        Err(e) => {
            tracing::debug!(error = %e, "hard link failed, copying signature");
            copy_new(from, to)?;
        }
    }

    if let Err(source) = fs::remove_file(from) {
        // Leave exactly one copy behind
        let _ = fs::remove_file(to);
        return Err(Error::AssetIo {
            path: from.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn copy_new(from: &Path, to: &Path) -> Result<()> {
    let mut reader = File::open(from).map_err(|source| Error::AssetIo {
        path: from.to_path_buf(),
        source,
    })?;

    let io_error = |source| Error::AssetIo {
        path: to.to_path_buf(),
        source,
    };
    let mut writer = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(io_error)?;

    if let Err(e) = io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all()) {
        drop(writer);
        let _ = fs::remove_file(to);
        return Err(io_error(e));
    }
    Ok(())
}

fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_error = |source| Error::AssetIo {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(io_error)?;
    file.write_all(bytes).map_err(io_error)?;
    Ok(())
}

/// Write every embedded raster image of `document`, in discovery order.
///
/// A page whose images cannot be listed is skipped and an image that cannot
/// be written is dropped; both are logged and extraction continues.
pub fn extract_assets(document: &dyn DocumentModel, store: &AssetStore) -> Vec<ExtractedAsset> {
    let mut assets = Vec::new();
    let mut ordinal = 0;

    for index in 0..document.page_count() {
        let page = index + 1;
        let images = match document.embedded_images(index) {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!(page, error = %e, "failed to list page images");
                continue;
            }
        };

        for (position, image) in images.into_iter().enumerate() {
            let current = ordinal;
            ordinal += 1;

            match store.write_image(page, position + 1, &image) {
                Ok(path) => assets.push(ExtractedAsset {
                    ordinal: current,
                    page,
                    bytes: image.bytes,
                    format: image.format,
                    path,
                }),
                Err(e) => {
                    tracing::warn!(page, ordinal = current, error = %e, "failed to store image");
                }
            }
        }
    }

    tracing::debug!(count = assets.len(), "embedded images extracted");
    assets
}

//! Export bundler
//!
//! Packs a project's stickers into `{output_dir}/{project_id}.zip` with
//! one `NN.png` entry per sticker. Artifacts that cannot be fetched or
//! decoded are logged and skipped; the archive itself must be written.

use crate::canvas::encode_png;
use crate::fetch::ArtifactFetcher;
use crate::model::Sticker;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sticker_core::{ContentHash, Result, StickerError};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// A written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub path: PathBuf,
    /// Entry names in archive order
    pub entries: Vec<String>,
    /// Stickers whose artifact could not be fetched or decoded
    pub skipped: usize,
    pub content_hash: ContentHash,
}

/// Entry name for the sticker at 1-based `ordinal`
pub fn entry_name(ordinal: usize) -> String {
    format!("{:02}.png", ordinal)
}

pub struct ExportBundler {
    fetcher: Arc<dyn ArtifactFetcher>,
    output_dir: PathBuf,
}

impl ExportBundler {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the archive for `stickers`, in the given order
    pub fn bundle(&self, project_id: &str, stickers: &[Sticker]) -> Result<ExportArtifact> {
        if project_id.trim().is_empty() {
            return Err(StickerError::Config("missing project id".to_string()));
        }
        if stickers.is_empty() {
            return Err(StickerError::Config("no stickers".to_string()));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.zip", project_id));
        let file = File::create(&path)?;
        let mut archive = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        let mut entries = Vec::new();
        let mut skipped = 0;
        for (i, sticker) in stickers.iter().enumerate() {
            let png = match self.load_png(sticker.best_url()) {
                Ok(png) => png,
                Err(e) => {
                    tracing::warn!(sticker = %sticker.id, error = %e, "skipping sticker in export");
                    skipped += 1;
                    continue;
                }
            };
            let name = entry_name(i + 1);
            archive
                .start_file(name.as_str(), options)
                .map_err(|e| StickerError::Archive(e.to_string()))?;
            archive.write_all(&png)?;
            entries.push(name);
        }

        archive
            .finish()
            .map_err(|e| StickerError::Archive(e.to_string()))?;
        let content_hash = ContentHash::from_file(&path)?;

        tracing::info!(
            project = project_id,
            path = %path.display(),
            entries = entries.len(),
            skipped,
            "export archive written"
        );
        Ok(ExportArtifact {
            path,
            entries,
            skipped,
            content_hash,
        })
    }

    /// Resolve a previously written archive by file name
    pub fn export_path(&self, name: &str) -> Result<PathBuf> {
        if !name.ends_with(".zip")
            || name.contains('/')
            || name.contains('\\')
            || name.starts_with('.')
        {
            return Err(StickerError::Config(format!("invalid export name: {}", name)));
        }
        let path = self.output_dir.join(name);
        if !path.is_file() {
            return Err(StickerError::not_found("Export", name));
        }
        Ok(path)
    }

    /// Fetch and re-encode an artifact as PNG
    fn load_png(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self.fetcher.fetch(url)?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| StickerError::InvalidImage(format!("cannot decode artifact: {}", e)))?;
        encode_png(&decoded.to_rgba8())
    }
}

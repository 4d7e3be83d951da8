//! Turn one file into zero or more resources.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

use pkiscout_core::{Location, Resource, Result, ScanError};

use crate::format::FormatRegistry;

/// Reads files and decodes them through a [`FormatRegistry`].
#[derive(Debug, Clone, Default)]
pub struct ResourceReader {
    registry: Arc<FormatRegistry>,
    type_filter: Option<BTreeSet<String>>,
}

impl ResourceReader {
    /// Reader over a shared registry.
    #[must_use]
    pub const fn new(registry: Arc<FormatRegistry>) -> Self {
        Self {
            registry,
            type_filter: None,
        }
    }

    /// Only keep blocks whose encoding-type tag is in `tags`.
    #[must_use]
    pub fn with_type_filter(mut self, tags: Option<BTreeSet<String>>) -> Self {
        self.type_filter = tags.filter(|t| !t.is_empty());
        self
    }

    /// Read and decode `path`.
    ///
    /// # Errors
    ///
    /// `ScanError::Io` if the file cannot be read, `ScanError::Decode` if no
    /// decoder recognizes it. A file whose blocks are all filtered out is
    /// `Ok` and empty.
    pub async fn read(&self, path: &Path) -> Result<Vec<Resource>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ScanError::io(path.display().to_string(), e))?;
        self.decode(path, &bytes)
    }

    /// Decode bytes already read from `path`.
    pub fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Vec<Resource>> {
        let extension = path.extension().and_then(|e| e.to_str());
        let blocks = self
            .registry
            .decode(extension, bytes)
            .map_err(|e| ScanError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let multi = blocks.len() > 1;
        let resources: Vec<Resource> = blocks
            .into_iter()
            .enumerate()
            .filter(|(_, block)| self.accepts(&block.tag))
            .map(|(i, block)| {
                // Indices count every block in the file, kept or not.
                let location = if multi {
                    Location::with_index(path, i + 1)
                } else {
                    Location::new(path)
                };
                block
                    .headers
                    .into_iter()
                    .fold(Resource::new(block.tag, block.der, location), |res, (k, v)| {
                        res.with_attribute(k, v)
                    })
            })
            .collect();

        trace!(path = %path.display(), count = resources.len(), "decoded file");
        Ok(resources)
    }

    fn accepts(&self, tag: &str) -> bool {
        self.type_filter
            .as_ref()
            .map_or(true, |allowed| allowed.contains(tag))
    }
}

//! Filesystem access for sprite descriptors and the images they reference.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::{debug, trace};

use crate::error::SpriteError;
use crate::sprite::{ImageSource, SpriteDescriptor};

/// Decodes images from disk, resolving descriptor paths against a base directory.
///
/// Descriptor paths may start with `/` to mean "relative to the sprite root" rather than the
/// filesystem root.
#[derive(Debug, Clone)]
pub struct FileImageSource {
    base_dir: PathBuf,
}

impl FileImageSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path.trim_start_matches('/'))
    }
}

impl ImageSource for FileImageSource {
    fn load(&self, path: &str) -> Result<RgbaImage, SpriteError> {
        let resolved = self.resolve(path);
        trace!(path = %resolved.display(), "Decoding sprite image");
        let bytes = fs::read(&resolved).map_err(|source| SpriteError::Read {
            path: resolved.clone(),
            source,
        })?;
        let decoded = image::load_from_memory(&bytes).map_err(|error| SpriteError::Decode {
            path: resolved,
            reason: error.to_string(),
        })?;
        Ok(decoded.to_rgba8())
    }
}

/// Reads and parses a descriptor file. Returns the descriptor together with an image source
/// rooted at the descriptor's directory.
pub fn load_descriptor(path: &Path) -> Result<(SpriteDescriptor, FileImageSource), SpriteError> {
    let text = fs::read_to_string(path).map_err(|source| SpriteError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let descriptor = SpriteDescriptor::from_json_str(&text)
        .ok_or_else(|| SpriteError::InvalidDescriptor(path.display().to_string()))?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    debug!(name = %descriptor.name, base = %base_dir.display(), "Sprite descriptor loaded");
    Ok((descriptor, FileImageSource::new(base_dir)))
}

//! Rendered image store.
//!
//! Keeps the most recent PNGs per requester. Each render overwrites both of
//! the requester's images; nothing is ever evicted.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

/// The two images a render produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageKind {
    Heightmap,
    Texture,
}

impl ImageKind {
    pub const ALL: [ImageKind; 2] = [ImageKind::Heightmap, ImageKind::Texture];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heightmap => "heightmap",
            Self::Texture => "texture",
        }
    }

    /// File name used when writing the image to disk.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Heightmap => "heightmap.png",
            Self::Texture => "texture.png",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageKind {
    type Err = ImageQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heightmap" | "height" => Ok(Self::Heightmap),
            "texture" | "textures" => Ok(Self::Texture),
            other => Err(ImageQueryError::InvalidArgument(format!(
                "invalid image type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageQueryError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{kind} for {requester} not available")]
    NotAvailable { requester: String, kind: ImageKind },
}

/// Most recent PNG bytes per (requester, kind).
#[derive(Debug, Default)]
pub struct ImageStore {
    images: DashMap<(String, ImageKind), Arc<Vec<u8>>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an image, replacing the previous one for the same key.
    pub fn put(&self, requester: &str, kind: ImageKind, png: Vec<u8>) {
        self.images
            .insert((requester.to_string(), kind), Arc::new(png));
    }

    pub fn get(&self, requester: &str, kind: ImageKind) -> Result<Arc<Vec<u8>>, ImageQueryError> {
        if requester.is_empty() {
            return Err(ImageQueryError::InvalidArgument(
                "no requester given".to_string(),
            ));
        }
        self.images
            .get(&(requester.to_string(), kind))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ImageQueryError::NotAvailable {
                requester: requester.to_string(),
                kind,
            })
    }

    /// Looks up an image by its kind's name.
    pub fn query(&self, requester: &str, kind: &str) -> Result<Arc<Vec<u8>>, ImageQueryError> {
        let kind: ImageKind = kind.parse()?;
        self.get(requester, kind)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

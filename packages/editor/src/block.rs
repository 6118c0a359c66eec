//! # Block Values
//!
//! The two kinds of content a document is made of: editable text and
//! interleaved images. Blocks are plain value objects. They never hold a
//! reference to the surface element they are rendered into; the render
//! adapter looks surfaces up by [`BlockId`] instead.
//!
//! Offsets into text are counted in chars, not bytes.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable identity of a block
///
/// Array positions shift on every insert/remove; the id does not. It is the
/// only safe way to re-target the caret after a structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block-{}", self.0)
    }
}

/// Reference to an uploaded resource, as returned by the upload collaborator
pub type ResourceRef = String;

/// Upload lifecycle of an image's backing resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Done,
    Failed,
}

/// Editable text block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: BlockId,
    pub content: String,
}

impl TextBlock {
    pub fn new(id: BlockId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }

    pub fn empty(id: BlockId) -> Self {
        Self::new(id, String::new())
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Truncate to `[0, offset)` and return `[offset, len)`.
    ///
    /// `offset` is clamped to the content length.
    pub fn split_off(&mut self, offset: usize) -> String {
        let at = byte_index(&self.content, offset);
        self.content.split_off(at)
    }
}

/// Image block interleaved between text blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub id: BlockId,

    /// Set once the upload collaborator has stored the resource
    pub resource_ref: Option<ResourceRef>,

    /// Locally derived preview, kept even when the upload fails
    pub preview_uri: String,

    pub upload_status: UploadStatus,

    #[serde(default)]
    pub caption: String,

    #[serde(default)]
    pub alt_text: String,
}

impl ImageBlock {
    /// New image whose upload has not completed yet
    pub fn pending(id: BlockId, source: &ImageSource) -> Self {
        Self {
            id,
            resource_ref: None,
            preview_uri: source.preview_uri(),
            upload_status: UploadStatus::Pending,
            caption: String::new(),
            alt_text: source.default_alt_text(),
        }
    }
}

/// Addressable unit of document content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

impl Block {
    pub fn text(id: BlockId, content: impl Into<String>) -> Self {
        Block::Text(TextBlock::new(id, content))
    }

    pub fn id(&self) -> BlockId {
        match self {
            Block::Text(text) => text.id,
            Block::Image(image) => image.id,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Block::Text(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Block::Image(_))
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Block::Text(text) => Some(text),
            Block::Image(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextBlock> {
        match self {
            Block::Text(text) => Some(text),
            Block::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageBlock> {
        match self {
            Block::Image(image) => Some(image),
            Block::Text(_) => None,
        }
    }

    pub fn as_image_mut(&mut self) -> Option<&mut ImageBlock> {
        match self {
            Block::Image(image) => Some(image),
            Block::Text(_) => None,
        }
    }
}

/// Where an inserted image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum ImageSource {
    /// Local file picked by the user
    File { path: PathBuf },

    /// Raw payload carried by a paste or drop event
    #[serde(rename_all = "camelCase")]
    Payload {
        name: Option<String>,
        mime_type: String,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

impl ImageSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        ImageSource::File { path: path.into() }
    }

    /// Preview derived without touching the network
    pub fn preview_uri(&self) -> String {
        match self {
            ImageSource::File { path } => format!("file://{}", path.display()),
            ImageSource::Payload {
                mime_type, data, ..
            } => format!(
                "data:{};base64,{}",
                mime_type,
                base64::engine::general_purpose::STANDARD.encode(data)
            ),
        }
    }

    fn default_alt_text(&self) -> String {
        match self {
            ImageSource::File { path } => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            ImageSource::Payload { name, .. } => name.clone().unwrap_or_default(),
        }
    }
}

/// Byte index of the char at `offset`, clamped to the end of `s`
pub(crate) fn byte_index(s: &str, offset: usize) -> usize {
    s.char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

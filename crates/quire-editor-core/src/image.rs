//! Image sources for inline images and embedding of local payloads.

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;

/// Where an inserted image comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    /// A remote URL, used verbatim.
    Url(String),
    /// A local binary payload, embedded as a data URL.
    Embedded {
        data: Bytes,
        /// Explicit MIME type. Sniffed from the bytes when absent.
        mime: Option<String>,
    },
}

impl ImageSource {
    pub fn url(url: impl Into<String>) -> Self {
        ImageSource::Url(url.into())
    }

    pub fn embedded(data: impl Into<Bytes>) -> Self {
        ImageSource::Embedded {
            data: data.into(),
            mime: None,
        }
    }

    /// The `src` attribute value for this image.
    pub fn to_src(&self) -> String {
        match self {
            ImageSource::Url(url) => url.trim().to_string(),
            ImageSource::Embedded { data, mime } => {
                let mime = mime
                    .as_deref()
                    .unwrap_or_else(|| data.sniff_mime_type().unwrap_or("application/octet-stream"));
                format!("data:{};base64,{}", mime, STANDARD.encode(data))
            }
        }
    }

    /// Whether there is anything to insert.
    pub fn is_empty(&self) -> bool {
        match self {
            ImageSource::Url(url) => url.trim().is_empty(),
            ImageSource::Embedded { data, .. } => data.is_empty(),
        }
    }
}

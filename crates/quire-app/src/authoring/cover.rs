use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;
use quire_common::CoverUpload;
use quire_editor_core::ImageSource;

/// The cover image held by an authoring session.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverImage {
    /// A local file picked for upload.
    File(CoverUpload),
    /// The cover the server already has, when editing.
    Existing(String),
}

impl CoverImage {
    /// A local file. The MIME type is sniffed from the bytes.
    pub fn file(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let mime = data
            .sniff_mime_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        CoverImage::File(CoverUpload {
            file_name: file_name.into(),
            mime,
            data,
        })
    }

    pub fn existing(url: impl Into<String>) -> Self {
        CoverImage::Existing(url.into())
    }

    /// Something a preview can show: the URL, or the file as a data URL.
    pub fn preview_src(&self) -> String {
        match self {
            CoverImage::Existing(url) => ImageSource::url(url.as_str()).to_src(),
            CoverImage::File(upload) => ImageSource::Embedded {
                data: upload.data.clone(),
                mime: Some(upload.mime.clone()),
            }
            .to_src(),
        }
    }

    /// The part to upload. An existing cover is kept server-side.
    pub fn upload(&self) -> Option<CoverUpload> {
        match self {
            CoverImage::File(upload) => Some(upload.clone()),
            CoverImage::Existing(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CoverImage::File(upload) => &upload.file_name,
            CoverImage::Existing(url) => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_file_cover_sniffs_mime() {
        let cover = CoverImage::file("cover.png", PNG);
        let upload = cover.upload().unwrap();
        assert_eq!(upload.mime, "image/png");
        assert!(cover.preview_src().starts_with("data:image/png;base64,"));
        assert_eq!(cover.name(), "cover.png");
    }

    #[test]
    fn test_existing_cover_is_not_uploaded() {
        let cover = CoverImage::existing("https://img.example/c.png");
        assert_eq!(cover.upload(), None);
        assert_eq!(cover.preview_src(), "https://img.example/c.png");
    }
}

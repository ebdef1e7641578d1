//! Image loading for annotation records.
//!
//! Images are embedded in the record verbatim, so they are never decoded to
//! pixels: the header is read with `imagesize` to confirm the container is
//! JPEG and to read the authoritative width and height.

use std::fs;
use std::path::Path;

use imagesize::ImageType;

use crate::error::RecordError;

/// Format string stored in `image/format`.
pub const JPEG_FORMAT: &str = "jpeg";

/// A JPEG file held in memory together with its dimensions.
#[derive(Clone, PartialEq, Eq)]
pub struct JpegImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for JpegImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JpegImage")
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Reads the JPEG at `path` and its header dimensions.
pub fn read_jpeg(path: &Path) -> Result<JpegImage, RecordError> {
    let bytes = fs::read(path).map_err(|source| RecordError::ImageRead {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    jpeg_from_bytes(bytes, path)
}

/// Validates in-memory image bytes as JPEG and reads their dimensions.
///
/// `path` is only used for error messages.
pub fn jpeg_from_bytes(bytes: Vec<u8>, path: &Path) -> Result<JpegImage, RecordError> {
    let kind = imagesize::image_type(&bytes).map_err(|source| RecordError::ImageRead {
        path: path.to_path_buf(),
        message: format!("unrecognized image data: {source}"),
    })?;

    if !matches!(kind, ImageType::Jpeg) {
        return Err(RecordError::UnsupportedImageFormat {
            path: path.to_path_buf(),
            format: format!("{kind:?}").to_ascii_lowercase(),
        });
    }

    let size = imagesize::blob_size(&bytes).map_err(|source| RecordError::ImageRead {
        path: path.to_path_buf(),
        message: format!("cannot read JPEG dimensions: {source}"),
    })?;

    let width = dimension_to_u32(size.width, "width", path)?;
    let height = dimension_to_u32(size.height, "height", path)?;

    Ok(JpegImage {
        bytes,
        width,
        height,
    })
}

fn dimension_to_u32(value: usize, axis: &str, path: &Path) -> Result<u32, RecordError> {
    match u32::try_from(value) {
        Ok(0) => Err(RecordError::ImageRead {
            path: path.to_path_buf(),
            message: format!("image {axis} is zero"),
        }),
        Ok(v) => Ok(v),
        Err(_) => Err(RecordError::ImageRead {
            path: path.to_path_buf(),
            message: format!("image {axis} {value} does not fit in u32"),
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest JPEG header imagesize accepts: SOI, JFIF APP0, SOF0, EOI.
    pub(crate) fn jpeg_bytes(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        bytes.extend_from_slice(&[
            0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
            0x00, 0x01, 0x00, 0x00,
        ]);
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    #[test]
    fn header_gives_dimensions() {
        let image = jpeg_from_bytes(jpeg_bytes(640, 480), Path::new("a.jpg")).expect("read jpeg header");
        assert_eq!(image.width, 640);
        assert_eq!(image.height, 480);
        assert_eq!(image.bytes, jpeg_bytes(640, 480));
    }

    #[test]
    fn png_is_unsupported() {
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(&[0, 0, 0, 13]);
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&[0, 0, 0, 8, 0, 0, 0, 8, 8, 2, 0, 0, 0]);

        let err = jpeg_from_bytes(png, Path::new("a.jpg")).unwrap_err();
        match err {
            RecordError::UnsupportedImageFormat { format, .. } => assert_eq!(format, "png"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_is_unreadable() {
        let err = jpeg_from_bytes(b"not an image at all".to_vec(), Path::new("a.jpg")).unwrap_err();
        assert!(matches!(err, RecordError::ImageRead { .. }));
    }

    #[test]
    fn read_jpeg_reports_missing_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let err = read_jpeg(&temp.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, RecordError::ImageRead { .. }));
    }
}

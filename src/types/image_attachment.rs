use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use base64::Engine;
use image::ImageFormat;

use crate::error::{Error, Result};

/// Prefix of every image data URI sent to the completion service.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// An uploaded image, held as PNG bytes.
///
/// JPEG uploads are decoded and re-encoded to PNG.  PNG uploads are validated
/// and kept byte-for-byte so the data URI is the exact base64 of the upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    png: Vec<u8>,
}

impl ImageAttachment {
    /// Create an attachment from raw image bytes in any supported format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)?;
        match format {
            ImageFormat::Png => Self::from_png_bytes(bytes.to_vec()),
            ImageFormat::Jpeg => {
                let decoded = image::load_from_memory_with_format(bytes, format)?;
                let mut png = Cursor::new(Vec::new());
                decoded.write_to(&mut png, ImageFormat::Png)?;
                Ok(Self {
                    png: png.into_inner(),
                })
            }
            other => Err(Error::encoding(
                format!("unsupported image format {other:?}; must be jpeg or png"),
                None,
            )),
        }
    }

    /// Create an attachment from bytes that are already PNG.
    pub fn from_png_bytes(png: Vec<u8>) -> Result<Self> {
        image::load_from_memory_with_format(&png, ImageFormat::Png)?;
        Ok(Self { png })
    }

    /// Read an attachment from a file.
    ///
    /// The extension must be one of jpg, jpeg or png.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") | Some("png") => {}
            _ => {
                return Err(Error::encoding(
                    format!(
                        "unsupported file extension for {}; must be jpg, jpeg, or png",
                        path.display()
                    ),
                    None,
                ));
            }
        }

        let mut file = File::open(path)
            .map_err(|err| Error::io(format!("failed to open {}", path.display()), err))?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        Self::from_bytes(&buffer)
    }

    /// The PNG encoding of the image.
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    /// Standard base64 of the PNG bytes.
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png)
    }

    /// The image as a `data:image/png;base64,...` URI.
    pub fn data_uri(&self) -> String {
        format!("{PNG_DATA_URI_PREFIX}{}", self.base64())
    }
}

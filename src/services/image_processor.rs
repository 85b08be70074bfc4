// src/services/image_processor.rs
use crate::errors::SnapcodeError;
use base64::{Engine as _, engine::general_purpose};
use image::{ColorType, GenericImageView, RgbImage, codecs::jpeg::JpegEncoder};

/// Claude rejects images whose base64 payload exceeds 5MB.
pub const CLAUDE_MAX_BASE64_BYTES: usize = 5 * 1024 * 1024;
/// Claude rejects images with a side longer than this.
pub const CLAUDE_MAX_DIMENSION: u32 = 7990;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub media_type: String,
    /// Still base64 encoded.
    pub data: String,
}

impl DataUrl {
    pub fn to_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

pub struct ImageProcessor;

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_data_url(&self, url: &str) -> Result<DataUrl, SnapcodeError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| SnapcodeError::ImageProcessing("Not a data URL".to_string()))?;
        let (header, data) = rest.split_once(',').ok_or_else(|| {
            SnapcodeError::ImageProcessing("Data URL has no payload".to_string())
        })?;
        let media_type = header.strip_suffix(";base64").ok_or_else(|| {
            SnapcodeError::ImageProcessing("Data URL is not base64 encoded".to_string())
        })?;
        if media_type.is_empty() {
            return Err(SnapcodeError::ImageProcessing(
                "Data URL has no media type".to_string(),
            ));
        }

        Ok(DataUrl {
            media_type: media_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn decode(&self, data_url: &DataUrl) -> Result<Vec<u8>, SnapcodeError> {
        general_purpose::STANDARD
            .decode(&data_url.data)
            .map_err(|e| SnapcodeError::ImageProcessing(format!("Invalid base64 payload: {}", e)))
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<(u32, u32), SnapcodeError> {
        let img = image::load_from_memory(data)
            .map_err(|e| SnapcodeError::ImageProcessing(format!("Invalid image format: {}", e)))?;

        Ok(img.dimensions())
    }

    /// Checks that a data URL carries a decodable image and returns its size.
    pub fn validate_data_url(&self, url: &str) -> Result<(u32, u32), SnapcodeError> {
        let data_url = self.parse_data_url(url)?;
        let bytes = self.decode(&data_url)?;
        self.validate_image(&bytes)
    }

    /// Shrinks an image until Claude will accept it. Images already within the
    /// limits are returned untouched.
    pub fn resize_for_claude(&self, data_url: &DataUrl) -> Result<DataUrl, SnapcodeError> {
        let bytes = self.decode(data_url)?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| SnapcodeError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let (width, height) = img.dimensions();
        let fits_dimensions = width <= CLAUDE_MAX_DIMENSION && height <= CLAUDE_MAX_DIMENSION;
        if fits_dimensions && data_url.data.len() <= CLAUDE_MAX_BASE64_BYTES {
            return Ok(data_url.clone());
        }

        let img = if fits_dimensions {
            img
        } else {
            let ratio = CLAUDE_MAX_DIMENSION as f32 / width.max(height) as f32;
            let new_width = ((width as f32 * ratio) as u32).max(1);
            let new_height = ((height as f32 * ratio) as u32).max(1);
            img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
        };

        // JPEG has no alpha channel.
        let rgb = img.to_rgb8();

        let mut quality = 95u8;
        loop {
            let encoded = Self::encode_jpeg(&rgb, quality)?;
            let data = general_purpose::STANDARD.encode(&encoded);
            if data.len() <= CLAUDE_MAX_BASE64_BYTES {
                log::debug!(
                    "Re-encoded image for Claude at quality {} ({} base64 bytes)",
                    quality,
                    data.len()
                );
                return Ok(DataUrl {
                    media_type: "image/jpeg".to_string(),
                    data,
                });
            }
            if quality <= 10 {
                return Err(SnapcodeError::ImageProcessing(
                    "Image is too large for Claude even at lowest quality".to_string(),
                ));
            }
            quality -= 5;
        }
    }

    fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>, SnapcodeError> {
        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, quality)
            .encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
            .map_err(|e| {
                SnapcodeError::ImageProcessing(format!("Failed to encode resized image: {}", e))
            })?;
        Ok(output)
    }
}

use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, Luma};
use qrcode::QrCode;
use std::io::Cursor;

/// Turns a credential secret into an embeddable image payload.
pub trait ImageRenderer: Send + Sync {
    fn render(&self, data: &str) -> Result<String>;
}

/// Renders a QR code as a `data:image/png;base64,...` URI.
#[derive(Debug, Clone)]
pub struct PngQrRenderer {
    min_size: u32,
}

impl Default for PngQrRenderer {
    fn default() -> Self {
        Self { min_size: 256 }
    }
}

impl PngQrRenderer {
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl ImageRenderer for PngQrRenderer {
    fn render(&self, data: &str) -> Result<String> {
        let code = QrCode::new(data.as_bytes())?;
        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_size, self.min_size)
            .build();

        let dynamic_image = DynamicImage::ImageLuma8(image);
        let mut buffer = Cursor::new(Vec::new());
        dynamic_image.write_to(&mut buffer, image::ImageOutputFormat::Png)?;

        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(buffer.get_ref())
        ))
    }
}

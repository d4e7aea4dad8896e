//! Decoded texture images
//!
//! A [`TextureImage`] keeps the channel count it was authored with. The
//! channel count decides the GPU format on upload and whether a drawable is
//! drawn in the alpha group.

use image::GenericImageView;

use crate::error::{Result, ViewerError};

/// Pixel layout implied by the channel count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 1 channel, grayscale or depth-like masks
    Gray,
    /// 2 channels
    GrayAlpha,
    /// 3 channels
    Rgb,
    /// 4 channels, alpha-using
    Rgba,
}

impl PixelFormat {
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::Gray),
            2 => Some(Self::GrayAlpha),
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Channels stored per texel on the GPU. There is no 3-channel 8-bit
    /// format, so RGB is padded to RGBA.
    pub fn gpu_channels(self) -> u8 {
        match self {
            Self::Rgb => 4,
            other => other.channels(),
        }
    }

    pub fn wgpu_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Gray => wgpu::TextureFormat::R8Unorm,
            Self::GrayAlpha => wgpu::TextureFormat::Rg8Unorm,
            Self::Rgb | Self::Rgba => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// CPU-side image: `pixels` is tightly packed, row-major, `channels` bytes per texel
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Decodes an encoded image (png, tga, jpeg, ...) keeping its channel count.
    /// Higher bit depths are reduced to 8 bits per channel.
    pub fn decode(path: &str, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|source| ViewerError::TextureDecode {
            path: path.to_string(),
            source,
        })?;

        let (width, height) = image.dimensions();
        let (format, pixels) = match image.color().channel_count() {
            1 => (PixelFormat::Gray, image.to_luma8().into_raw()),
            2 => (PixelFormat::GrayAlpha, image.to_luma_alpha8().into_raw()),
            3 => (PixelFormat::Rgb, image.to_rgb8().into_raw()),
            _ => (PixelFormat::Rgba, image.to_rgba8().into_raw()),
        };

        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    pub fn from_raw(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width * height) as usize * format.channels() as usize
        );
        Self {
            width,
            height,
            format,
            pixels,
        }
    }

    /// 1x1 opaque white, bound wherever a sampler needs *some* texture
    pub fn white() -> Self {
        Self::from_raw(1, 1, PixelFormat::Rgba, vec![255, 255, 255, 255])
    }

    pub fn channels(&self) -> u8 {
        self.format.channels()
    }

    pub fn has_alpha(&self) -> bool {
        self.format == PixelFormat::Rgba
    }

    /// Texel data in the layout the GPU format expects
    pub fn gpu_pixels(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgb => self
                .pixels
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
                .collect(),
            _ => self.pixels.clone(),
        }
    }

    /// Full mip chain in GPU layout, level 0 first, down to 1x1.
    /// Each level is a 2x2 box filter of the previous one.
    pub fn mip_chain(&self) -> Vec<MipLevel> {
        let channels = self.format.gpu_channels() as usize;
        let mut levels = vec![MipLevel {
            width: self.width,
            height: self.height,
            pixels: self.gpu_pixels(),
        }];

        while let Some(last) = levels.last() {
            if last.width == 1 && last.height == 1 {
                break;
            }
            let next = last.downsample(channels);
            levels.push(next);
        }

        levels
    }
}

/// One level of a mip chain
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl MipLevel {
    fn downsample(&self, channels: usize) -> MipLevel {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let src_width = self.width as usize;
        let mut pixels = Vec::with_capacity(width as usize * height as usize * channels);

        for y in 0..height as usize {
            for x in 0..width as usize {
                let x0 = (x * 2).min(self.width as usize - 1);
                let x1 = (x * 2 + 1).min(self.width as usize - 1);
                let y0 = (y * 2).min(self.height as usize - 1);
                let y1 = (y * 2 + 1).min(self.height as usize - 1);

                for c in 0..channels {
                    let sum = self.pixels[(y0 * src_width + x0) * channels + c] as u32
                        + self.pixels[(y0 * src_width + x1) * channels + c] as u32
                        + self.pixels[(y1 * src_width + x0) * channels + c] as u32
                        + self.pixels[(y1 * src_width + x1) * channels + c] as u32;
                    pixels.push(((sum + 2) / 4) as u8);
                }
            }
        }

        MipLevel {
            width,
            height,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(image: image::DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_channel_count_maps_to_format() {
        assert_eq!(PixelFormat::Gray.wgpu_format(), wgpu::TextureFormat::R8Unorm);
        assert_eq!(PixelFormat::GrayAlpha.wgpu_format(), wgpu::TextureFormat::Rg8Unorm);
        assert_eq!(PixelFormat::Rgb.wgpu_format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(PixelFormat::Rgba.wgpu_format(), wgpu::TextureFormat::Rgba8Unorm);
        assert_eq!(PixelFormat::from_channels(5), None);
    }

    #[test]
    fn test_decode_keeps_channel_count() {
        let rgb = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        let decoded = TextureImage::decode("rgb.png", &encode_png(rgb)).unwrap();
        assert_eq!(decoded.channels(), 3);
        assert!(!decoded.has_alpha());

        let rgba = image::DynamicImage::ImageRgba8(image::RgbaImage::new(2, 2));
        let decoded = TextureImage::decode("rgba.png", &encode_png(rgba)).unwrap();
        assert_eq!(decoded.channels(), 4);
        assert!(decoded.has_alpha());

        let gray = image::DynamicImage::ImageLuma8(image::GrayImage::new(3, 1));
        let decoded = TextureImage::decode("gray.png", &encode_png(gray)).unwrap();
        assert_eq!(decoded.channels(), 1);
        assert_eq!(decoded.pixels.len(), 3);
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let result = TextureImage::decode("broken.png", b"definitely not an image");
        match result {
            Err(ViewerError::TextureDecode { path, .. }) => assert_eq!(path, "broken.png"),
            other => panic!("expected TextureDecode, got {:?}", other),
        }
    }

    #[test]
    fn test_rgb_is_padded_for_upload() {
        let image = TextureImage::from_raw(2, 1, PixelFormat::Rgb, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(image.gpu_pixels(), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_mip_chain_reaches_one_texel() {
        let image = TextureImage::from_raw(4, 2, PixelFormat::Gray, vec![0, 0, 100, 100, 0, 0, 100, 100]);
        let chain = image.mip_chain();
        let sizes: Vec<(u32, u32)> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(4, 2), (2, 1), (1, 1)]);
        assert_eq!(chain[1].pixels, vec![0, 100]);
        assert_eq!(chain[2].pixels, vec![50]);
    }
}

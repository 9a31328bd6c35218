//! Texture loading and upload.
//!
//! Images are decoded with the `image` crate into interleaved, row-major RGBA8 with the top
//! row first. That is already the order wgpu expects for `Queue::write_texture` (texel
//! `(0, 0)` is the first row written), so no channel permutation or vertical flip is
//! applied. A mip chain is built on the CPU and every level is uploaded.
//!
//! A file that is missing, cannot be decoded, or is larger than the device allows never
//! reaches the device: [`Texture::load`]
//! logs the failure and uploads a small magenta placeholder instead.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

/// Color of the placeholder texture, chosen to stand out in the scene.
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("failed to decode texture {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("texture {} has no pixels", path.display())]
    Empty { path: PathBuf },

    #[error(
        "texture {} is {width}x{height}, larger than the device limit of {max_dimension}",
        path.display()
    )]
    TooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dimension: u32,
    },
}

/// A sampled 2D texture together with the bind group the fragment stage reads it through.
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

impl Texture {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Layout of the texture bind group: the texture view at binding `0` and a filtering
    /// sampler at binding `1`, both visible to the fragment stage.
    pub fn create_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    /// Decodes `path` and uploads it, falling back to the placeholder when decoding fails
    /// or the image exceeds the device's 2D texture limit.
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        path: &Path,
    ) -> Self {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let decoded =
            decode_rgba(path).and_then(|image| check_dimensions(path, image, max_dimension));
        let image = match decoded {
            Ok(image) => {
                log::info!(
                    "Loaded texture {} ({} x {})",
                    path.display(),
                    image.width(),
                    image.height()
                );
                image
            }
            Err(error) => {
                log::warn!("{error}; using placeholder texture");
                placeholder_image()
            }
        };

        let label = path.display().to_string();
        Self::from_image(device, queue, layout, image, &label)
    }

    /// Uploads `image` and all of its mip levels.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: RgbaImage,
        label: &str,
    ) -> Self {
        let (width, height) = image.dimensions();
        let mip_levels = mip_chain(image);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip_level, level) in mip_levels.iter().enumerate() {
            let (level_width, level_height) = level.dimensions();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip_level as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                level.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * level_width),
                    rows_per_image: Some(level_height),
                },
                wgpu::Extent3d {
                    width: level_width,
                    height: level_height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            texture,
            view,
            sampler,
            bind_group,
        }
    }
}

/// Decodes an image file into interleaved RGBA8.
pub fn decode_rgba(path: &Path) -> Result<RgbaImage, TextureError> {
    let image = image::open(path)
        .map_err(|source| TextureError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    if image.width() == 0 || image.height() == 0 {
        return Err(TextureError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(image)
}

/// Passes `image` through if neither side exceeds `max_dimension`.
pub fn check_dimensions(
    path: &Path,
    image: RgbaImage,
    max_dimension: u32,
) -> Result<RgbaImage, TextureError> {
    let (width, height) = image.dimensions();
    if width > max_dimension || height > max_dimension {
        return Err(TextureError::TooLarge {
            path: path.to_path_buf(),
            width,
            height,
            max_dimension,
        });
    }
    Ok(image)
}

/// A 2x2 texture filled with [`PLACEHOLDER_COLOR`].
pub fn placeholder_image() -> RgbaImage {
    RgbaImage::from_pixel(2, 2, PLACEHOLDER_COLOR)
}

/// Number of mip levels down to 1x1 for a base level of `width` x `height`.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Builds the full mip chain, base level first, halving each dimension (never below 1).
pub fn mip_chain(base: RgbaImage) -> Vec<RgbaImage> {
    let count = mip_level_count(base.width(), base.height()) as usize;
    let mut levels = Vec::with_capacity(count);
    levels.push(base);

    while levels.len() < count {
        let previous = &levels[levels.len() - 1];
        let width = (previous.width() / 2).max(1);
        let height = (previous.height() / 2).max(1);
        let next = image::imageops::resize(previous, width, height, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_solid_magenta() {
        let image = placeholder_image();
        assert_eq!(image.dimensions(), (2, 2));
        assert!(image.pixels().all(|pixel| *pixel == PLACEHOLDER_COLOR));
    }

    #[test]
    fn mip_level_count_reaches_one_texel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 64), 9);
        assert_eq!(mip_level_count(300, 200), 9);
    }

    #[test]
    fn mip_chain_halves_down_to_one_texel() {
        let levels = mip_chain(RgbaImage::from_pixel(8, 2, Rgba([10, 20, 30, 255])));
        let sizes: Vec<(u32, u32)> = levels.iter().map(|level| level.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn images_beyond_the_device_limit_are_rejected() {
        let path = Path::new("wide.bmp");
        let error = check_dimensions(path, RgbaImage::new(17, 4), 16).unwrap_err();
        assert!(matches!(
            error,
            TextureError::TooLarge {
                width: 17,
                height: 4,
                max_dimension: 16,
                ..
            }
        ));
        assert!(check_dimensions(path, RgbaImage::new(4, 17), 16).is_err());

        let fitting = check_dimensions(path, RgbaImage::new(16, 16), 16).unwrap();
        assert_eq!(fitting.dimensions(), (16, 16));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let error = decode_rgba(Path::new("does/not/exist.bmp")).unwrap_err();
        assert!(matches!(error, TextureError::Decode { .. }));
    }
}

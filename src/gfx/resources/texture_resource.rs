//! Texture resource management for wgpu
//!
//! Provides utilities for creating GPU textures, views and samplers: depth and
//! multisample render targets, the shadow map, the mipmapped color map and the HDR
//! environment map.

use half::f16;

use crate::loading::{EnvironmentImage, TextureImage};

/// GPU texture resource containing texture, view, and sampler
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    /// Standard depth buffer format used throughout the engine
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Format of the uploaded HDR environment map
    pub const ENVIRONMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Creates a depth buffer for a `width` x `height` target
    pub fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        sample_count: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Multisampled color target resolved into the surface each frame
    pub fn create_msaa_target(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSAA Color Target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor::default());

        Self {
            texture,
            view,
            sampler,
        }
    }

    pub fn create_shadow_map(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Shadow maps need a comparison sampler
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            lod_min_clamp: 0.0,
            lod_max_clamp: 100.0,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads an sRGB color map with a full CPU-generated mip chain.
    ///
    /// `anisotropy` above 1 turns on anisotropic filtering; wgpu requires linear filtering on
    /// every axis for that, which this sampler always uses.
    pub fn create_color_map(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &TextureImage,
        anisotropy: u16,
        label: &str,
    ) -> Self {
        let (width, height) = (image.width.max(1), image.height.max(1));
        let mip_level_count = mip_level_count(width, height);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let mut level_data = image.rgba.clone();
        let (mut level_width, mut level_height) = (width, height);
        for mip_level in 0..mip_level_count {
            if mip_level > 0 {
                level_data = downsample_rgba8(&level_data, level_width, level_height);
                level_width = (level_width / 2).max(1);
                level_height = (level_height / 2).max(1);
            }
            write_level(
                queue,
                &texture,
                mip_level,
                &level_data,
                4 * level_width,
                level_width,
                level_height,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: anisotropy.clamp(1, 16),
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Uploads a linear HDR equirectangular panorama as half floats
    pub fn create_environment(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &EnvironmentImage,
        label: &str,
    ) -> Self {
        let (width, height) = (image.width.max(1), image.height.max(1));
        let texels: Vec<f16> = image.rgba.iter().map(|&c| f16::from_f32(c)).collect();

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::ENVIRONMENT_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        write_level(
            queue,
            &texture,
            0,
            bytemuck::cast_slice(&texels),
            8 * width,
            width,
            height,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        // Wraps horizontally around the panorama, clamps at the poles
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// 1x1 stand-in bound while the real color map is loading
    pub fn create_placeholder_color(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create_color_map(
            device,
            queue,
            &TextureImage {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            },
            1,
            "Placeholder Color Map",
        )
    }

    /// 1x1 black stand-in bound while no environment map is available
    pub fn create_placeholder_environment(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self::create_environment(
            device,
            queue,
            &EnvironmentImage {
                width: 1,
                height: 1,
                rgba: vec![0.0, 0.0, 0.0, 1.0],
            },
            "Placeholder Environment",
        )
    }
}

fn write_level(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level: u32,
    data: &[u8],
    bytes_per_row: u32,
    width: u32,
    height: u32,
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_row),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Halves an RGBA8 image with a 2x2 box filter (fewer samples at odd edges)
pub fn downsample_rgba8(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let new_width = (width / 2).max(1);
    let new_height = (height / 2).max(1);
    let mut out = vec![0u8; (new_width * new_height * 4) as usize];

    for y in 0..new_height {
        for x in 0..new_width {
            let mut sum = [0u32; 4];
            let mut count = 0u32;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (sx, sy) = (x * 2 + dx, y * 2 + dy);
                if sx < width && sy < height {
                    let idx = ((sy * width + sx) * 4) as usize;
                    for (channel, total) in sum.iter_mut().enumerate() {
                        *total += data[idx + channel] as u32;
                    }
                    count += 1;
                }
            }
            let dst = ((y * new_width + x) * 4) as usize;
            for (channel, total) in sum.iter().enumerate() {
                out[dst + channel] = (total / count) as u8;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_level_count() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(1024, 512), 11);
        assert_eq!(mip_level_count(1000, 3), 10);
    }

    #[test]
    fn test_downsample_averages_blocks() {
        #[rustfmt::skip]
        let data = [
            0, 0, 0, 255,     100, 100, 100, 255,
            200, 200, 200, 255, 100, 100, 100, 255,
        ];
        assert_eq!(downsample_rgba8(&data, 2, 2), vec![100, 100, 100, 255]);
    }

    #[test]
    fn test_downsample_odd_width_keeps_one_column() {
        let data = vec![50u8; 12];
        let out = downsample_rgba8(&data, 3, 1);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 50);
    }
}

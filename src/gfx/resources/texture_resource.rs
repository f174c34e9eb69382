//! Texture resource management for wgpu
//!
//! The only texture the engine samples is the color map, a 256x1 row that
//! turns a cell byte into a display color.

use crate::error::{LifeError, Result};
use crate::simulation::{ALIVE, DEAD};

/// Entries in the color map, one per possible cell byte
pub const COLOR_MAP_SIZE: u32 = 256;

/// GPU texture resource containing texture, view, and sampler
#[derive(Clone)]
pub struct TextureResource {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl TextureResource {
    pub const COLOR_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Creates the 256x1 color map from raw RGBA data
    ///
    /// Sampling is nearest with repeat addressing, so every cell value maps
    /// to exactly one entry with no blending between neighbours.
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `queue` - WGPU queue for uploading data
    /// * `rgba` - 256 RGBA8 entries, indexed by cell value
    /// * `label` - Debug label for the texture
    pub fn create_color_map(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        label: &str,
    ) -> Result<Self> {
        let expected = (COLOR_MAP_SIZE * 4) as usize;
        if rgba.len() != expected {
            return Err(LifeError::InvalidColorMap {
                expected,
                actual: rgba.len(),
            });
        }

        let size = wgpu::Extent3d {
            width: COLOR_MAP_SIZE,
            height: 1,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::COLOR_MAP_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * COLOR_MAP_SIZE),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label} View")),
            dimension: Some(wgpu::TextureViewDimension::D2),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

/// Default ramp: live cells bright green, dead cells near-black, with a
/// smooth blend between for any intermediate byte
pub fn default_color_ramp() -> Vec<u8> {
    const LIVE: [f32; 3] = [110.0, 230.0, 150.0];
    const DEAD_RGB: [f32; 3] = [10.0, 12.0, 24.0];

    (0..COLOR_MAP_SIZE)
        .flat_map(|i| {
            let t = i as f32 / (COLOR_MAP_SIZE - 1) as f32;
            let channel = |c: usize| (LIVE[c] + (DEAD_RGB[c] - LIVE[c]) * t).round() as u8;
            [channel(0), channel(1), channel(2), 255]
        })
        .collect()
}

/// RGBA entry of `ramp` for a cell byte
pub fn ramp_entry(ramp: &[u8], value: u8) -> Option<[u8; 4]> {
    let start = value as usize * 4;
    ramp.get(start..start + 4)
        .and_then(|entry| entry.try_into().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ramp_has_one_entry_per_value() {
        let ramp = default_color_ramp();
        assert_eq!(ramp.len(), (COLOR_MAP_SIZE * 4) as usize);
        assert_eq!(ramp_entry(&ramp, ALIVE), Some([110, 230, 150, 255]));
        assert_eq!(ramp_entry(&ramp, DEAD), Some([10, 12, 24, 255]));
    }

    #[test]
    fn test_ramp_entry_out_of_range() {
        assert_eq!(ramp_entry(&[0; 8], 2), None);
        assert_eq!(ramp_entry(&[1, 2, 3, 4, 5, 6, 7, 8], 1), Some([5, 6, 7, 8]));
    }

    #[test]
    fn test_color_map_is_a_single_row_2d_texture() {
        let Ok(ctx) = pollster::block_on(crate::gfx::GpuContext::headless()) else {
            eprintln!("skipping GPU test: no adapter");
            return;
        };
        let map = TextureResource::create_color_map(
            &ctx.device,
            &ctx.queue,
            &default_color_ramp(),
            "Test Color Map",
        )
        .unwrap();
        assert_eq!(map.texture.dimension(), wgpu::TextureDimension::D2);
        assert_eq!((map.texture.width(), map.texture.height()), (COLOR_MAP_SIZE, 1));

        let short = TextureResource::create_color_map(&ctx.device, &ctx.queue, &[0; 16], "Short");
        assert!(matches!(
            short,
            Err(LifeError::InvalidColorMap { expected: 1024, actual: 16 })
        ));
    }
}

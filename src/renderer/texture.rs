use crate::renderer::error::RenderError;

/// A sampled 2D texture plus its view and sampler.
#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Create from tightly packed RGBA8 pixels.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
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
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

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

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// A 1x1 texture used wherever a material leaves a map slot empty.
    pub fn neutral(device: &wgpu::Device, queue: &wgpu::Queue, rgba: [u8; 4]) -> Self {
        Self::from_rgba8(device, queue, &rgba, 1, 1, "NeutralTexture")
    }
}

/// Expand 1/3/4-channel pixel data to tightly packed RGBA8.  Single-channel
/// input replicates into the color channels; alpha defaults to opaque.
pub fn expand_to_rgba(
    pixels: &[u8],
    width: u32,
    height: u32,
    channels: u8,
    name: &str,
) -> Result<Vec<u8>, RenderError> {
    let count = (width as usize) * (height as usize);
    let expected = count * channels as usize;
    if pixels.len() < expected {
        return Err(RenderError::TextureChannels {
            channels,
            name: name.to_owned(),
        });
    }

    match channels {
        4 => Ok(pixels[..expected].to_vec()),
        3 => {
            let mut out = Vec::with_capacity(count * 4);
            for px in pixels[..expected].chunks_exact(3) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            Ok(out)
        }
        1 => {
            let mut out = Vec::with_capacity(count * 4);
            for &g in &pixels[..expected] {
                out.extend_from_slice(&[g, g, g, 255]);
            }
            Ok(out)
        }
        _ => Err(RenderError::TextureChannels {
            channels,
            name: name.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_expands_with_opaque_alpha() {
        let out = expand_to_rgba(&[1, 2, 3, 4, 5, 6], 2, 1, 3, "t").unwrap();
        assert_eq!(out, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn grayscale_replicates() {
        let out = expand_to_rgba(&[7], 1, 1, 1, "t").unwrap();
        assert_eq!(out, vec![7, 7, 7, 255]);
    }

    #[test]
    fn rgba_passes_through() {
        let out = expand_to_rgba(&[9, 8, 7, 6], 1, 1, 4, "t").unwrap();
        assert_eq!(out, vec![9, 8, 7, 6]);
    }

    #[test]
    fn two_channel_input_is_rejected() {
        assert!(expand_to_rgba(&[0, 0], 1, 1, 2, "t").is_err());
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert!(expand_to_rgba(&[0, 0, 0], 2, 1, 3, "t").is_err());
    }
}

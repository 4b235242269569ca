use glam::Vec3;

use crate::renderer::error::RenderError;
use crate::renderer::gpu::{AttributeKind, BufferKind, GpuBuffer, VertexAttribute, VertexLayout};
use crate::renderer::primitives::SKYBOX_VERTICES;

/// Recognized cubemap atlas arrangements, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtlasLayout {
    /// Six square faces in a row.
    Horizontal,
    /// Six square faces in a column.
    Vertical,
    /// 3x2 grid: +X -X +Y / -Y +Z -Z.
    Grid3x2,
    /// 4x3 cross with +Y above and -Y below the horizontal strip.
    Cross4x3,
}

/// Post-processing applied to the face mapping after layout detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CubemapOrientation {
    #[default]
    Default,
    TopFlip,
    BottomFlip,
    FlipX,
    FlipY,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Detect the atlas layout purely from image dimensions.  Layouts are tried
/// in a fixed priority order; no match fails the whole atlas.
pub fn detect_layout(width: u32, height: u32) -> Result<(AtlasLayout, u32, u32), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::AtlasLayout { width, height });
    }

    if width % 6 == 0 && width / 6 == height {
        Ok((AtlasLayout::Horizontal, width / 6, height))
    } else if height % 6 == 0 && height / 6 == width {
        Ok((AtlasLayout::Vertical, width, height / 6))
    } else if width % 3 == 0 && height % 2 == 0 && width / 3 == height / 2 {
        Ok((AtlasLayout::Grid3x2, width / 3, height / 2))
    } else if width % 4 == 0 && height % 3 == 0 && width / 4 == height / 3 {
        Ok((AtlasLayout::Cross4x3, width / 4, height / 3))
    } else {
        Err(RenderError::AtlasLayout { width, height })
    }
}

/// Face rectangles in cubemap layer order +X, -X, +Y, -Y, +Z, -Z.
pub fn face_rects(layout: AtlasLayout, face_w: u32, face_h: u32) -> [FaceRect; 6] {
    let cell = |cx: u32, cy: u32| FaceRect {
        x: cx * face_w,
        y: cy * face_h,
        w: face_w,
        h: face_h,
    };

    match layout {
        AtlasLayout::Horizontal => [0u32, 1, 2, 3, 4, 5].map(|i| cell(i, 0)),
        AtlasLayout::Vertical => [0u32, 1, 2, 3, 4, 5].map(|i| cell(0, i)),
        AtlasLayout::Grid3x2 => [
            cell(0, 0), // +X
            cell(1, 0), // -X
            cell(2, 0), // +Y
            cell(0, 1), // -Y
            cell(1, 1), // +Z
            cell(2, 1), // -Z
        ],
        AtlasLayout::Cross4x3 => [
            cell(2, 1), // +X
            cell(0, 1), // -X
            cell(1, 0), // +Y
            cell(1, 2), // -Y
            cell(1, 1), // +Z
            cell(3, 1), // -Z
        ],
    }
}

/// Swap face slots according to the orientation parameter.
pub fn apply_orientation(rects: &mut [FaceRect; 6], orientation: CubemapOrientation) {
    match orientation {
        CubemapOrientation::Default => {}
        CubemapOrientation::TopFlip | CubemapOrientation::BottomFlip => {
            rects.swap(2, 3);
        }
        CubemapOrientation::FlipX => {
            rects.swap(0, 1);
            rects.swap(4, 5);
        }
        CubemapOrientation::FlipY => {
            rects.swap(2, 3);
            rects.swap(4, 5);
        }
    }
}

/// Every face must sit fully inside the atlas; a single violation fails the
/// whole cubemap (no partial loads).
pub fn validate_rects(rects: &[FaceRect; 6], width: u32, height: u32) -> Result<(), RenderError> {
    for (face, rect) in rects.iter().enumerate() {
        let x_end = rect.x.checked_add(rect.w);
        let y_end = rect.y.checked_add(rect.h);
        let inside = matches!((x_end, y_end), (Some(xe), Some(ye)) if xe <= width && ye <= height);
        if !inside {
            return Err(RenderError::AtlasFaceBounds {
                face,
                x: rect.x,
                y: rect.y,
                w: rect.w,
                h: rect.h,
                width,
                height,
            });
        }
    }
    Ok(())
}

fn extract_face(rgba: &[u8], atlas_width: u32, rect: &FaceRect) -> Vec<u8> {
    const BYTES_PER_PIXEL: usize = 4;
    let pitch = atlas_width as usize * BYTES_PER_PIXEL;
    let row_bytes = rect.w as usize * BYTES_PER_PIXEL;

    let mut face = Vec::with_capacity(rect.h as usize * row_bytes);
    for y in 0..rect.h as usize {
        let row = rect.y as usize + y;
        let start = row * pitch + rect.x as usize * BYTES_PER_PIXEL;
        face.extend_from_slice(&rgba[start..start + row_bytes]);
    }
    face
}

/// Static cube geometry, environment cubemap and ambient tint.  Built once at
/// initialization and reused every frame.
pub struct Skybox {
    vertex_buffer: GpuBuffer,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    layout: VertexLayout,
    ambient: Vec3,
    ambient_intensity: f32,
}

impl Skybox {
    /// Build from a decoded RGBA atlas image.  Layout is detected from the
    /// dimensions; any out-of-bounds face aborts the whole load.
    pub fn from_atlas(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        width: u32,
        height: u32,
        orientation: CubemapOrientation,
        ambient: Vec3,
        ambient_intensity: f32,
    ) -> Result<Self, RenderError> {
        let (layout, face_w, face_h) = detect_layout(width, height)?;
        let mut rects = face_rects(layout, face_w, face_h);
        apply_orientation(&mut rects, orientation);
        validate_rects(&rects, width, height)?;

        log::info!(
            "Cubemap atlas {}x{} detected as {:?}, face {}x{}",
            width,
            height,
            layout,
            face_w,
            face_h
        );

        let faces: Vec<Vec<u8>> = rects
            .iter()
            .map(|rect| extract_face(rgba, width, rect))
            .collect();
        let face_refs: Vec<&[u8]> = faces.iter().map(Vec::as_slice).collect();

        Ok(Self::from_faces(
            device,
            queue,
            &face_refs,
            face_w,
            face_h,
            ambient,
            ambient_intensity,
        ))
    }

    /// Single-pixel cubemap in the ambient color, used when no atlas is
    /// configured or its load failed.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        ambient: Vec3,
        ambient_intensity: f32,
    ) -> Self {
        let pixel = [
            (ambient.x.clamp(0.0, 1.0) * 255.0) as u8,
            (ambient.y.clamp(0.0, 1.0) * 255.0) as u8,
            (ambient.z.clamp(0.0, 1.0) * 255.0) as u8,
            255,
        ];
        let faces = [&pixel[..]; 6];
        Self::from_faces(device, queue, &faces, 1, 1, ambient, ambient_intensity)
    }

    fn from_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[&[u8]],
        face_w: u32,
        face_h: u32,
        ambient: Vec3,
        ambient_intensity: f32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("EnvironmentCubemap"),
            size: wgpu::Extent3d {
                width: face_w,
                height: face_h,
                depth_or_array_layers: 6,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate() {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                face,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * face_w),
                    rows_per_image: Some(face_h),
                },
                wgpu::Extent3d {
                    width: face_w,
                    height: face_h,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("EnvironmentCubemapView"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("EnvironmentSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let vertex_buffer = GpuBuffer::with_data(
            device,
            BufferKind::Vertex,
            bytemuck::cast_slice(SKYBOX_VERTICES.as_slice()),
        );

        let layout = VertexLayout::new(
            &[VertexAttribute {
                location: 0,
                components: 3,
                kind: AttributeKind::Float32,
                normalized: false,
                offset: 0,
            }],
            12,
        );

        Self {
            vertex_buffer,
            _texture: texture,
            view,
            sampler,
            layout,
            ambient,
            ambient_intensity,
        }
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        self.vertex_buffer.raw()
    }

    pub fn vertex_count(&self) -> u32 {
        SKYBOX_VERTICES.len() as u32 / 3
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn ambient_intensity(&self) -> f32 {
        self.ambient_intensity
    }

    /// Clear color for the main target: the ambient tint.
    pub fn clear_color(&self) -> wgpu::Color {
        wgpu::Color {
            r: (self.ambient.x * self.ambient_intensity) as f64,
            g: (self.ambient.y * self.ambient_intensity) as f64,
            b: (self.ambient.z * self.ambient_intensity) as f64,
            a: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_strip_is_detected_first() {
        let (layout, fw, fh) = detect_layout(768, 128).unwrap();
        assert_eq!(layout, AtlasLayout::Horizontal);
        assert_eq!((fw, fh), (128, 128));

        let rects = face_rects(layout, fw, fh);
        for (i, rect) in rects.iter().enumerate() {
            assert_eq!(*rect, FaceRect { x: i as u32 * 128, y: 0, w: 128, h: 128 });
        }
    }

    #[test]
    fn vertical_and_grid_layouts_detect() {
        assert_eq!(
            detect_layout(128, 768).unwrap().0,
            AtlasLayout::Vertical
        );
        assert_eq!(detect_layout(384, 256).unwrap().0, AtlasLayout::Grid3x2);
        assert_eq!(detect_layout(512, 384).unwrap().0, AtlasLayout::Cross4x3);
    }

    #[test]
    fn non_dividing_dimensions_fail() {
        assert!(detect_layout(402, 300).is_err());
        assert!(detect_layout(1024, 1024).is_err());
        assert!(detect_layout(0, 128).is_err());
    }

    #[test]
    fn cross_layout_maps_fixed_cells() {
        let rects = face_rects(AtlasLayout::Cross4x3, 64, 64);
        assert_eq!(rects[0], FaceRect { x: 128, y: 64, w: 64, h: 64 }); // +X
        assert_eq!(rects[1], FaceRect { x: 0, y: 64, w: 64, h: 64 }); // -X
        assert_eq!(rects[2], FaceRect { x: 64, y: 0, w: 64, h: 64 }); // +Y
        assert_eq!(rects[3], FaceRect { x: 64, y: 128, w: 64, h: 64 }); // -Y
        assert_eq!(rects[4], FaceRect { x: 64, y: 64, w: 64, h: 64 }); // +Z
        assert_eq!(rects[5], FaceRect { x: 192, y: 64, w: 64, h: 64 }); // -Z
    }

    #[test]
    fn orientation_swaps_expected_slots() {
        let base = face_rects(AtlasLayout::Grid3x2, 32, 32);

        let mut flipped = base;
        apply_orientation(&mut flipped, CubemapOrientation::TopFlip);
        assert_eq!(flipped[2], base[3]);
        assert_eq!(flipped[3], base[2]);

        let mut x_flipped = base;
        apply_orientation(&mut x_flipped, CubemapOrientation::FlipX);
        assert_eq!(x_flipped[0], base[1]);
        assert_eq!(x_flipped[1], base[0]);
        assert_eq!(x_flipped[4], base[5]);
        assert_eq!(x_flipped[5], base[4]);

        let mut y_flipped = base;
        apply_orientation(&mut y_flipped, CubemapOrientation::FlipY);
        assert_eq!(y_flipped[2], base[3]);
        assert_eq!(y_flipped[4], base[5]);
    }

    #[test]
    fn out_of_bounds_face_fails_whole_atlas() {
        let mut rects = face_rects(AtlasLayout::Horizontal, 128, 128);
        rects[5].x = 700; // 700 + 128 > 768
        assert!(validate_rects(&rects, 768, 128).is_err());
    }

    #[test]
    fn face_extraction_copies_rows() {
        // 2x1 atlas of two pixels; take the right pixel as a 1x1 face
        let rgba = [10, 11, 12, 13, 20, 21, 22, 23];
        let rect = FaceRect { x: 1, y: 0, w: 1, h: 1 };
        assert_eq!(extract_face(&rgba, 2, &rect), vec![20, 21, 22, 23]);
    }
}

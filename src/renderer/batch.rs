use std::collections::HashMap;

use glam::Mat4;

use crate::asset::{Handle, Mesh};
use crate::renderer::Material;
use crate::scene::Transform;

/// Batch identity for the main pass.  Keyed by handle identity, never by
/// content: two materials with equal fields but distinct handles stay in
/// separate batches.  The derived `Hash` combines both handle hashes
/// order-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub mesh: Handle<Mesh>,
    pub material: Handle<Material>,
}

/// Borrowed view of one main-pass batch.
pub struct Batch<'a> {
    pub mesh: Handle<Mesh>,
    pub material: Handle<Material>,
    pub instances: &'a [Mat4],
}

/// Borrowed view of one shadow batch (material-agnostic).
pub struct ShadowBatch<'a> {
    pub mesh: Handle<Mesh>,
    pub instances: &'a [Mat4],
}

/// Groups per-entity draw requests into instanced batches.  N requests
/// collapse into at most one draw per distinct (mesh, material) pair, and one
/// depth-only draw per distinct mesh.
#[derive(Default)]
pub struct RenderBatcher {
    render: HashMap<BatchKey, Vec<Mat4>>,
    shadow: HashMap<Handle<Mesh>, Vec<Mat4>>,
}

impl RenderBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every instance list while keeping the map entries and their
    /// backing allocations, so steady-state frames reuse capacity.
    pub fn begin_frame(&mut self) {
        for instances in self.render.values_mut() {
            instances.clear();
        }
        for instances in self.shadow.values_mut() {
            instances.clear();
        }
    }

    pub fn add_to_render_batch(
        &mut self,
        transform: &Transform,
        mesh: Handle<Mesh>,
        material: Handle<Material>,
    ) {
        self.render
            .entry(BatchKey { mesh, material })
            .or_default()
            .push(transform.matrix());
    }

    pub fn add_to_shadow_batch(&mut self, transform: &Transform, mesh: Handle<Mesh>) {
        self.shadow.entry(mesh).or_default().push(transform.matrix());
    }

    /// Main-pass batches with at least one instance.  Empty entries are
    /// skipped, never deleted.
    pub fn render_batches(&self) -> impl Iterator<Item = Batch<'_>> {
        self.render
            .iter()
            .filter(|(_, instances)| !instances.is_empty())
            .map(|(key, instances)| Batch {
                mesh: key.mesh,
                material: key.material,
                instances,
            })
    }

    pub fn shadow_batches(&self) -> impl Iterator<Item = ShadowBatch<'_>> {
        self.shadow
            .iter()
            .filter(|(_, instances)| !instances.is_empty())
            .map(|(mesh, instances)| ShadowBatch {
                mesh: *mesh,
                instances,
            })
    }

    /// Number of batches the main pass would draw this frame.
    pub fn batch_count(&self) -> usize {
        self.render_batches().count()
    }

    pub fn instance_count(&self) -> usize {
        self.render.values().map(Vec::len).sum()
    }

    pub fn shadow_instance_count(&self) -> usize {
        self.shadow.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn mesh(i: usize) -> Handle<Mesh> {
        Handle::new(i)
    }

    fn material(i: usize) -> Handle<Material> {
        Handle::new(i)
    }

    #[test]
    fn batches_split_by_handle_pair() {
        let mut batcher = RenderBatcher::new();
        let t = Transform::IDENTITY;
        batcher.add_to_render_batch(&t, mesh(0), material(0));
        batcher.add_to_render_batch(&t, mesh(0), material(1));
        batcher.add_to_render_batch(&t, mesh(1), material(0));
        batcher.add_to_render_batch(&t, mesh(0), material(0));

        assert_eq!(batcher.batch_count(), 3);
        assert_eq!(batcher.instance_count(), 4);
    }

    #[test]
    fn swapped_handles_do_not_collide() {
        let mut batcher = RenderBatcher::new();
        let t = Transform::IDENTITY;
        batcher.add_to_render_batch(&t, mesh(1), material(2));
        batcher.add_to_render_batch(&t, mesh(2), material(1));
        assert_eq!(batcher.batch_count(), 2);
    }

    #[test]
    fn begin_frame_keeps_entries_but_empties_them() {
        let mut batcher = RenderBatcher::new();
        let t = Transform::IDENTITY;
        batcher.add_to_render_batch(&t, mesh(0), material(0));
        batcher.add_to_shadow_batch(&t, mesh(0));
        batcher.begin_frame();

        assert_eq!(batcher.batch_count(), 0);
        assert_eq!(batcher.render_batches().count(), 0);
        assert_eq!(batcher.shadow_batches().count(), 0);
        // The entry survives for capacity reuse
        assert_eq!(batcher.render.len(), 1);
        assert_eq!(batcher.shadow.len(), 1);
    }

    #[test]
    fn instances_keep_insertion_order() {
        let mut batcher = RenderBatcher::new();
        for x in 0..3 {
            let t = Transform::at(Vec3::new(x as f32, 0.0, 0.0));
            batcher.add_to_render_batch(&t, mesh(0), material(0));
        }

        let batch = batcher.render_batches().next().unwrap();
        assert_eq!(batch.instances.len(), 3);
        for (i, matrix) in batch.instances.iter().enumerate() {
            assert_eq!(matrix.w_axis.x, i as f32);
        }
    }

    #[test]
    fn shadow_batches_ignore_materials() {
        let mut batcher = RenderBatcher::new();
        let t = Transform::IDENTITY;
        batcher.add_to_shadow_batch(&t, mesh(0));
        batcher.add_to_shadow_batch(&t, mesh(0));
        let batch = batcher.shadow_batches().next().unwrap();
        assert_eq!(batch.instances.len(), 2);
    }
}

use glam::Vec3;
use wgpu_forward::asset::Handle;
use wgpu_forward::renderer::RenderBatcher;
use wgpu_forward::scene::Transform;

#[test]
fn three_entities_one_pair_is_one_batch_of_three() {
    let mut batcher = RenderBatcher::new();
    batcher.begin_frame();

    let mesh = Handle::new(0);
    let material = Handle::new(0);

    for x in [0.0f32, 1.0, 2.0] {
        let transform = Transform::at(Vec3::new(x, 0.0, 0.0));
        batcher.add_to_render_batch(&transform, mesh, material);
    }

    assert_eq!(batcher.batch_count(), 1);

    let batch = batcher.render_batches().next().unwrap();
    assert_eq!(batch.instances.len(), 3);
    // Insertion order = submission order
    for (i, matrix) in batch.instances.iter().enumerate() {
        assert_eq!(matrix.w_axis.x, i as f32);
    }
}

#[test]
fn distinct_pairs_get_distinct_batches() {
    let mut batcher = RenderBatcher::new();
    batcher.begin_frame();

    let submissions = [(0usize, 0usize), (0, 1), (1, 0), (0, 0), (1, 0)];
    for (mesh, material) in submissions {
        batcher.add_to_render_batch(
            &Transform::IDENTITY,
            Handle::new(mesh),
            Handle::new(material),
        );
    }

    // Three distinct (mesh, material) pairs were submitted
    assert_eq!(batcher.batch_count(), 3);
    assert_eq!(batcher.instance_count(), submissions.len());

    for batch in batcher.render_batches() {
        let expected = submissions
            .iter()
            .filter(|(m, mat)| *m == batch.mesh.index() && *mat == batch.material.index())
            .count();
        assert_eq!(batch.instances.len(), expected);
    }
}

#[test]
fn empty_frame_produces_no_draws() {
    let mut batcher = RenderBatcher::new();
    batcher.add_to_render_batch(&Transform::IDENTITY, Handle::new(0), Handle::new(0));
    batcher.add_to_shadow_batch(&Transform::IDENTITY, Handle::new(0));

    batcher.begin_frame();

    assert_eq!(batcher.batch_count(), 0);
    assert_eq!(batcher.render_batches().count(), 0);
    assert_eq!(batcher.shadow_batches().count(), 0);

    // Clearing twice is idempotent
    batcher.begin_frame();
    assert_eq!(batcher.batch_count(), 0);
}

#[test]
fn shadow_batches_merge_across_materials() {
    let mut batcher = RenderBatcher::new();
    batcher.begin_frame();

    let mesh = Handle::new(7);
    batcher.add_to_render_batch(&Transform::IDENTITY, mesh, Handle::new(0));
    batcher.add_to_render_batch(&Transform::IDENTITY, mesh, Handle::new(1));
    batcher.add_to_shadow_batch(&Transform::IDENTITY, mesh);
    batcher.add_to_shadow_batch(&Transform::IDENTITY, mesh);

    // Two main batches (distinct materials), one shadow batch (same mesh)
    assert_eq!(batcher.batch_count(), 2);
    assert_eq!(batcher.shadow_batches().count(), 1);
    assert_eq!(batcher.shadow_batches().next().unwrap().instances.len(), 2);
}

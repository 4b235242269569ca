use wgpu_forward::renderer::skybox::{
    apply_orientation, detect_layout, face_rects, validate_rects, AtlasLayout, CubemapOrientation,
    FaceRect,
};

#[test]
fn six_by_one_strip_selects_horizontal_layout() {
    let (layout, face_w, face_h) = detect_layout(1536, 256).unwrap();
    assert_eq!(layout, AtlasLayout::Horizontal);
    assert_eq!((face_w, face_h), (1536 / 6, 256));

    let rects = face_rects(layout, face_w, face_h);
    for (i, rect) in rects.iter().enumerate() {
        assert_eq!(rect.x, i as u32 * face_w);
        assert_eq!(rect.y, 0);
        assert_eq!((rect.w, rect.h), (face_w, face_h));
    }
    assert!(validate_rects(&rects, 1536, 256).is_ok());
}

#[test]
fn non_dividing_cross_dimensions_fail_detection() {
    // 402x300 is "roughly" 4x3 but 402 is not divisible by 4
    assert!(detect_layout(402, 300).is_err());
    // Divisible but cells are not square
    assert!(detect_layout(400, 30).is_err());
}

#[test]
fn detection_priority_is_fixed() {
    // Degenerate 36x6 satisfies the horizontal rule; priority picks it
    let (layout, _, _) = detect_layout(36, 6).unwrap();
    assert_eq!(layout, AtlasLayout::Horizontal);
}

#[test]
fn orientation_swaps_compose_with_any_layout() {
    for layout in [
        AtlasLayout::Horizontal,
        AtlasLayout::Vertical,
        AtlasLayout::Grid3x2,
        AtlasLayout::Cross4x3,
    ] {
        let base = face_rects(layout, 16, 16);

        let mut flipped = base;
        apply_orientation(&mut flipped, CubemapOrientation::BottomFlip);
        assert_eq!(flipped[2], base[3]);
        assert_eq!(flipped[3], base[2]);
        for i in [0usize, 1, 4, 5] {
            assert_eq!(flipped[i], base[i]);
        }
    }
}

#[test]
fn out_of_bounds_face_rect_is_a_hard_failure() {
    let rects = [
        FaceRect { x: 0, y: 0, w: 64, h: 64 },
        FaceRect { x: 64, y: 0, w: 64, h: 64 },
        FaceRect { x: 128, y: 0, w: 64, h: 64 },
        FaceRect { x: 192, y: 0, w: 64, h: 64 },
        FaceRect { x: 256, y: 0, w: 64, h: 64 },
        // Last face extends one pixel past the atlas edge
        FaceRect { x: 321, y: 0, w: 64, h: 64 },
    ];
    assert!(validate_rects(&rects, 384, 64).is_err());
}

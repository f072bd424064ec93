// End-to-end O3 decoding from synthetic model and animation buffers

use std::fs;

use chasm_models::error::DecodeError;
use chasm_models::model::{decode_o3, decode_o3_animated, load_o3, load_o3_animated};
use chasm_models::ModelSummary;
use cgmath::Vector3;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::{o3_animation, o3_model, shifted_frame, Polygon};

const QUAD: [[i16; 3]; 4] = [[0, 0, 0], [2048, 0, 0], [2048, 2048, 0], [0, 2048, 0]];

fn textured_quad() -> Polygon {
    Polygon::quad(0, 1, 2, 3).with_uv([[0, 0], [64, 0], [64, 64], [0, 64]])
}

#[test]
fn single_quad_with_full_texture() {
    let data = o3_model(&QUAD, &[textured_quad()], 64);
    let model = decode_o3(&data, None).unwrap();

    assert_eq!(model.texture.width, 64);
    assert_eq!(model.texture.height, 64);
    assert_eq!(model.texture.pixels, data[common::O3_TEXTURE_OFFSET..].to_vec());

    let mesh = &model.mesh;
    assert_eq!(mesh.regular_indices, vec![2, 1, 0, 0, 3, 2]);
    assert!(mesh.transparent_indices.is_empty());
    assert_eq!(mesh.vertices.len(), 4);
    assert_eq!(mesh.frame_count, 1);

    let uvs: Vec<[f32; 2]> = mesh.vertices.iter().map(|v| v.tex_coord).collect();
    assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
    assert!(mesh.vertices.iter().all(|v| v.groups_mask == 255 && !v.alpha_tested));

    let bbox = mesh.bounding_boxes[0];
    assert_eq!(bbox.min, Vector3::new(0.0, 0.0, 0.0));
    assert_eq!(bbox.max, Vector3::new(1.0, 1.0, 0.0));
    assert_eq!((mesh.z_min, mesh.z_max), (0.0, 0.0));
    assert_eq!(mesh.position(0, 2), Some(Vector3::new(1.0, 1.0, 0.0)));

    assert!(mesh.check_invariants().is_empty());
}

#[test]
fn single_quad_summary() {
    let data = o3_model(&QUAD, &[textured_quad()], 64);
    let summary = ModelSummary::from_model(&decode_o3(&data, None).unwrap());
    insta::assert_debug_snapshot!("quad_summary", summary);
}

#[test]
fn two_sided_translucent_quad_goes_to_transparent_list() {
    let data = o3_model(&QUAD, &[textured_quad().with_flags(0x01 | 0x08)], 1);
    let model = decode_o3(&data, None).unwrap();

    assert!(model.mesh.regular_indices.is_empty());
    assert_eq!(
        model.mesh.transparent_indices,
        vec![2, 1, 0, 0, 3, 2, 0, 1, 2, 2, 3, 0]
    );
    assert!(model.mesh.vertices.iter().all(|v| v.alpha_tested));
}

#[test]
fn corner_outside_position_table_is_rejected() {
    let data = o3_model(&QUAD[..3], &[Polygon::quad(0, 5, 1, 2)], 1);
    match decode_o3(&data, None) {
        Err(DecodeError::VertexIndexOutOfRange {
            polygon,
            index,
            vertex_count,
        }) => assert_eq!((polygon, index, vertex_count), (0, 5, 3)),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn animations_are_laid_out_back_to_back() {
    let data = o3_model(&QUAD, &[textured_quad()], 1);
    let walk = o3_animation(4, &[shifted_frame(&QUAD, 10), shifted_frame(&QUAD, 20)]);
    let jump = o3_animation(
        4,
        &[
            shifted_frame(&QUAD, 30),
            shifted_frame(&QUAD, 40),
            shifted_frame(&QUAD, 50),
        ],
    );

    let model = decode_o3_animated(&data, &[walk.as_slice(), jump.as_slice()]).unwrap();
    let mesh = &model.mesh;

    assert_eq!(mesh.frame_count, 5);
    assert_eq!(mesh.animation_vertices.len(), 20);
    let ranges: Vec<(u32, u32, u32)> = mesh
        .animations
        .iter()
        .map(|a| (a.id, a.first_frame, a.frame_count))
        .collect();
    assert_eq!(ranges, vec![(0, 0, 2), (1, 2, 3)]);

    // first frame of the second animation is the first frame of its stream
    assert_eq!(mesh.frame(2)[1].position, [2048 + 30, 0, 0]);
    assert_eq!(mesh.frame(mesh.animations[1].frame_at(4, false))[0].position, [50, 0, 0]);
    assert_eq!(mesh.bounding_boxes.len(), 5);
    assert!(mesh.check_invariants().is_empty());
}

#[test]
fn no_animation_streams_means_base_pose() {
    let data = o3_model(&QUAD, &[textured_quad()], 1);
    let plain = decode_o3(&data, None).unwrap();
    let animated = decode_o3_animated(&data, &[]).unwrap();
    assert_eq!(plain, animated);
}

#[test]
fn load_from_files() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("quad.3o");
    let anim_path = dir.path().join("quad.ani");
    fs::write(&model_path, o3_model(&QUAD, &[textured_quad()], 2)).unwrap();
    fs::write(&anim_path, o3_animation(4, &[shifted_frame(&QUAD, 1)])).unwrap();

    let model = load_o3(&model_path).unwrap();
    assert_eq!(model.texture.height, 2);

    let animated = load_o3_animated(&model_path, &[&anim_path]).unwrap();
    assert_eq!(animated.mesh.frame(0)[0].position, [1, 0, 0]);
}

#[test]
fn load_reports_path_of_bad_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.3o");
    fs::write(&path, [0u8; 16]).unwrap();

    let err = load_o3(&path).unwrap_err();
    assert!(err.to_string().contains("short.3o"), "{}", err);
    assert!(err.downcast_ref::<DecodeError>().is_some());

    assert!(load_o3(&dir.path().join("missing.3o")).is_err());
}

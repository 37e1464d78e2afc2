//! Inverse bind matrices.
//!
//! A skinned vertex is stored in the space of the node that owns its mesh.
//! Its inverse bind matrix for joint J takes it from there into J's rest
//! space:
//!
//!     mesh local --(mesh world)--> world --(J world)^-1--> J local
//!
//! Both world transforms must be invertible.

use cgmath::{Matrix4, SquareMatrix};
use errors::{ErrorKind, Result};
use scene::{NodeIdx, Scene};

/// The inverse bind matrix of `joint` for a mesh owned by `mesh_owner`.
pub fn inverse_bind_matrix(
    scene: &Scene,
    joint: NodeIdx,
    mesh_owner: NodeIdx,
) -> Result<Matrix4<f32>> {
    let joint_node = &scene.nodes[joint];
    let owner_node = &scene.nodes[mesh_owner];

    let owner_inv = match owner_node.world.invert() {
        Some(m) => m,
        None => bail!(ErrorKind::NonInvertible(
            format!("world transform of mesh node {}", owner_node.name)
        )),
    };
    // The joint's world transform expressed relative to the mesh.
    let joint_in_mesh = owner_inv * joint_node.world;
    match joint_in_mesh.invert() {
        Some(m) => Ok(m),
        None => bail!(ErrorKind::NonInvertible(
            format!("bind pose of joint {} for mesh node {}", joint_node.name, owner_node.name)
        )),
    }
}

/// Inverse bind matrices for each joint in turn.
pub fn inverse_bind_matrices(
    scene: &Scene,
    joints: &[NodeIdx],
    mesh_owner: NodeIdx,
) -> Result<Vec<Matrix4<f32>>> {
    joints.iter()
        .map(|&joint| inverse_bind_matrix(scene, joint, mesh_owner))
        .collect()
}

#[test]
fn test_inverse_bind_matrix() {
    use cgmath::{vec3, vec4, One};
    use scene::fixtures;

    let scene = fixtures::skinned_arm();
    // lower_arm sits at (1, 1, 0) in world space; the mesh node at the origin.
    let m = inverse_bind_matrix(&scene, 3, 4).unwrap();
    assert_eq!(m, Matrix4::from_translation(vec3(-1.0, -1.0, 0.0)));

    // A point at the joint's position lands on the joint's origin.
    let p = m * vec4(1.0, 1.0, 0.0, 1.0);
    assert_eq!(p, vec4(0.0, 0.0, 0.0, 1.0));

    // A node bound against itself is the identity.
    assert_eq!(inverse_bind_matrix(&scene, 3, 3).unwrap(), Matrix4::one());
}

#[test]
fn test_mesh_space_is_respected() {
    use cgmath::vec3;
    use scene::fixtures;

    let mut scene = fixtures::skinned_arm();
    scene.nodes[4].local = Matrix4::from_translation(vec3(0.0, 0.0, 2.0));
    scene.compute_world_transforms();

    let m = inverse_bind_matrix(&scene, 2, 4).unwrap();
    // upper_arm at (0, 1, 0), mesh at (0, 0, 2): mesh-local (0, 1, -2) is the joint.
    assert_eq!(m, Matrix4::from_translation(vec3(0.0, -1.0, 2.0)));
}

#[test]
fn test_singular_world_transform() {
    use cgmath::Zero;
    use scene::fixtures;

    let mut scene = fixtures::skinned_arm();
    scene.nodes[3].local = Matrix4::zero();
    scene.compute_world_transforms();

    let err = inverse_bind_matrices(&scene, &[2, 3], 4).unwrap_err();
    match *err.kind() {
        ErrorKind::NonInvertible(ref what) => assert!(what.contains("lower_arm")),
        _ => panic!("unexpected error: {}", err),
    }
}

//! Small hand-built scenes for tests.

use cgmath::{vec2, vec3, Matrix4, One, Vector3, Zero};
use scene::*;
use smallvec::SmallVec;

fn translate(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::from_translation(vec3(x, y, z))
}

/// Build a scene from `(name, local, parent)` triples. Index 0 must be the
/// root and parents must come before their children.
pub fn scene(nodes: &[(&str, Matrix4<f32>, Option<NodeIdx>)], bones: &[NodeIdx]) -> Scene {
    let mut out = Vec::with_capacity(nodes.len());
    for (idx, &(name, local, parent)) in nodes.iter().enumerate() {
        out.push(Node::new(name, local));
        if let Some(parent) = parent {
            out[parent].children.push(idx);
        }
    }
    let mut scene = Scene {
        nodes: out,
        bones: bones.iter().map(|&node| Bone { node }).collect(),
        materials: vec![Material::new("body")],
        textures: vec![],
    };
    scene.compute_world_transforms();
    scene
}

pub fn weight(slots: &[(BoneIdx, f32)]) -> VertexWeight {
    VertexWeight {
        slots: slots.iter()
            .map(|&(bone, weight)| Influence { bone, weight })
            .collect::<SmallVec<_>>(),
    }
}

/// A mesh with `n` vertices along the x axis, fanned into triangles.
pub fn strip_mesh(n: usize) -> Mesh {
    let triangles = (2..n as u32).map(|i| [0, i - 1, i]).collect();
    Mesh {
        vertices: (0..n).map(|i| vec3(i as f32, 0.0, 0.0)).collect(),
        normals: vec![Vector3::unit_z(); n],
        uv0: Some((0..n).map(|i| vec2(i as f32 * 0.25, 0.25)).collect()),
        triangles,
        weights: None,
        morph_targets: vec![],
        material: "body".to_string(),
    }
}

pub fn attach(scene: &mut Scene, node: NodeIdx, mesh: Mesh) {
    scene.nodes[node].attachments.push(Attachment::Mesh(mesh));
}

/// RootNode -> root -> { upper_arm -> lower_arm, arm_mesh }
///
/// The two arm nodes are joints; arm_mesh carries a 3-vertex mesh skinned to
/// them.
pub fn skinned_arm() -> Scene {
    let mut scene = scene(&[
        ("RootNode", Matrix4::one(), None),
        ("root", Matrix4::one(), Some(0)),
        ("upper_arm", translate(0.0, 1.0, 0.0), Some(1)),
        ("lower_arm", translate(1.0, 0.0, 0.0), Some(2)),
        ("arm_mesh", Matrix4::one(), Some(1)),
    ], &[2, 3]);
    let mut mesh = strip_mesh(3);
    mesh.weights = Some(vec![
        weight(&[(0, 1.0)]),
        weight(&[(0, 0.5), (1, 0.5)]),
        weight(&[(1, 1.0)]),
    ]);
    attach(&mut scene, 4, mesh);
    scene
}

/// RootNode -> root -> hand (joint) -> sword (plain mesh)
pub fn sword_in_hand() -> Scene {
    let mut scene = scene(&[
        ("RootNode", Matrix4::one(), None),
        ("root", Matrix4::one(), Some(0)),
        ("hand", translate(0.0, 1.0, 0.0), Some(1)),
        ("sword", translate(0.0, 0.0, 0.5), Some(2)),
    ], &[2]);
    attach(&mut scene, 3, strip_mesh(4));
    scene
}

/// RootNode -> root -> { spine (joint), face (skinned + morphed mesh) }
///
/// Morph targets 0 and 2 are all zeros.
pub fn morphing_face() -> Scene {
    let mut scene = scene(&[
        ("RootNode", Matrix4::one(), None),
        ("root", Matrix4::one(), Some(0)),
        ("spine", translate(0.0, 1.5, 0.0), Some(1)),
        ("face", Matrix4::one(), Some(1)),
    ], &[2]);
    let mut mesh = strip_mesh(3);
    mesh.weights = Some(vec![weight(&[(0, 1.0)]); 3]);
    mesh.morph_targets = vec![
        MorphTarget { offsets: vec![Vector3::zero(); 3] },
        MorphTarget { offsets: vec![vec3(0.0, 0.5, 0.0); 3] },
        MorphTarget { offsets: vec![Vector3::zero(); 3] },
        MorphTarget { offsets: vec![Vector3::zero(), Vector3::zero(), vec3(0.0, 0.0, 1.0)] },
    ];
    attach(&mut scene, 3, mesh);
    scene
}

/// RootNode -> root -> { prop (plain mesh), empty }
pub fn plain_prop() -> Scene {
    let mut scene = scene(&[
        ("RootNode", Matrix4::one(), None),
        ("root", Matrix4::one(), Some(0)),
        ("prop", translate(2.0, 0.0, 0.0), Some(1)),
        ("empty", Matrix4::one(), Some(1)),
    ], &[]);
    attach(&mut scene, 2, strip_mesh(3));
    scene
}

//! Meshes hung directly under joints.
//!
//! Blender won't import a mesh whose node is parented to a joint. In
//! compatibility mode such a node is pulled out of the hierarchy, moved to
//! the top of the visual scene, and bound to its old parent through a skin
//! with one joint and every vertex weighted fully to it. That keeps it
//! following the joint when the skeleton is posed.

use errors::{ErrorKind, Result};
use scene::NodeIdx;
use skin::bind_pose::inverse_bind_matrix;
use super::{geometry_id, skeleton_root, skin_id, Ctx};
use super::controllers::SkinData;
use super::visual_scene::bind_material;
use super::xml::{Esc, Xml};

/// A mesh node moved out from under a joint.
pub struct Relocation {
    /// The node carrying the mesh.
    pub node: NodeIdx,
    /// Its parent; the joint it is now skinned to.
    pub joint: NodeIdx,
    pub mesh_id: usize,
}

/// Checks the mesh in `node`'s `attachment` slot can be relocated.
pub fn relocate(
    ctx: &Ctx,
    joint: NodeIdx,
    node: NodeIdx,
    attachment: usize,
) -> Result<Relocation> {
    let name = &ctx.scene.nodes[node].name;
    let mesh_id = match ctx.index.mesh_id(node, attachment) {
        Some(id) => id,
        None => bail!(ErrorKind::MeshNotIndexed(name.clone(), attachment)),
    };
    let mesh = ctx.index.meshes[mesh_id].mesh;
    if mesh.has_vertex_weights() {
        bail!(ErrorKind::JointAttachmentWeighted(name.clone()));
    }
    if mesh.has_morph_targets() {
        bail!(ErrorKind::JointAttachmentMorphed(name.clone()));
    }

    debug!("relocating {} out from under joint {}",
        name, ctx.scene.nodes[joint].name);
    let children = &ctx.scene.nodes[node].children;
    if !children.is_empty() {
        let names = children.iter()
            .map(|&child| ctx.scene.nodes[child].name.as_str())
            .collect::<Vec<_>>();
        warn!("{} is moved out from under joint {}; dropping its children: {}",
            name, ctx.scene.nodes[joint].name, names.join(", "));
    }

    Ok(Relocation { node, joint, mesh_id })
}

/// The single-joint skin binding a relocated mesh to its joint.
pub fn skin_data<'a>(ctx: &Ctx<'a>, relocation: &Relocation) -> Result<SkinData<'a>> {
    let scene = ctx.scene;
    let entry = &ctx.index.meshes[relocation.mesh_id];
    let num_verts = entry.mesh.vertex_count();

    let inv_bind = inverse_bind_matrix(scene, relocation.node, entry.owner)?;

    Ok(SkinData {
        mesh_id: relocation.mesh_id,
        source: geometry_id(relocation.mesh_id),
        bind_shape: scene.nodes[relocation.node].world,
        joint_names: vec![scene.nodes[relocation.joint].name.as_str()],
        inv_binds: vec![inv_bind],
        weights: vec![1.0; num_verts],
        vcount: vec![1; num_verts],
        v: (0..num_verts).flat_map(|i| vec![0, i]).collect(),
    })
}

/// The relocated node, written at the top level of the visual scene. Its
/// children are not written.
pub fn write_node(xml: &mut Xml, ctx: &Ctx, relocation: &Relocation) {
    let node = &ctx.scene.nodes[relocation.node];
    let mesh = ctx.index.meshes[relocation.mesh_id].mesh;
    let name = Esc(&node.name);

    xml!(xml;
        <node id=[(name)] sid=[(name)] name=[(name)] type=["NODE"]>;
            <matrix sid=["matrix"]>MATRIX(&node.local)</matrix>;
            <instance_controller url=["#"(skin_id(relocation.mesh_id))]>;
                <skeleton>"#"(Esc(skeleton_root(ctx)))</skeleton>;
    );
    bind_material(xml, mesh);
    xml!(xml;
            /instance_controller>;
        /node>;
    );
}

#[test]
fn test_relocation_skin() {
    use convert::collada::test_ctx;
    use cgmath::{Matrix4, One};
    use scene::fixtures;

    let scene = fixtures::sword_in_hand();
    let data = test_ctx(&scene, |ctx| {
        let relocation = relocate(ctx, 2, 3, 0).unwrap();
        assert_eq!(relocation.mesh_id, 0);
        let data = skin_data(ctx, &relocation).unwrap();
        (data.joint_names.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
         data.inv_binds, data.weights, data.vcount, data.v, data.source)
    });
    let (joints, inv_binds, weights, vcount, v, source) = data;

    assert_eq!(joints, vec!["hand".to_string()]);
    // The node owns its own mesh, so its bind pose relative to itself is
    // the identity.
    assert_eq!(inv_binds, vec![Matrix4::one()]);
    assert_eq!(weights, vec![1.0; 4]);
    assert_eq!(vcount, vec![1; 4]);
    assert_eq!(v, vec![0, 0, 0, 1, 0, 2, 0, 3]);
    assert_eq!(source, "meshId0");
}

#[test]
fn test_morphed_joint_attachment_fails() {
    use cgmath::vec3;
    use convert::collada::test_ctx;
    use scene::{fixtures, Attachment, MorphTarget};

    let mut scene = fixtures::sword_in_hand();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[3].attachments[0] {
        mesh.morph_targets.push(MorphTarget { offsets: vec![vec3(0.0, 1.0, 0.0); 4] });
    }
    let err = test_ctx(&scene, |ctx| relocate(ctx, 2, 3, 0).err().unwrap());
    match *err.kind() {
        ErrorKind::JointAttachmentMorphed(ref node) => assert_eq!(node, "sword"),
        _ => panic!("unexpected error: {}", err),
    }

    // A degenerate target doesn't count.
    let mut scene = fixtures::sword_in_hand();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[3].attachments[0] {
        mesh.morph_targets.push(MorphTarget { offsets: vec![vec3(0.0, 0.0, 0.0); 4] });
    }
    assert!(test_ctx(&scene, |ctx| relocate(ctx, 2, 3, 0).is_ok()));
}

#[test]
fn test_unindexed_mesh() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let scene = fixtures::sword_in_hand();
    let err = test_ctx(&scene, |ctx| relocate(ctx, 2, 3, 5).err().unwrap());
    match *err.kind() {
        ErrorKind::MeshNotIndexed(ref node, 5) => assert_eq!(node, "sword"),
        _ => panic!("unexpected error: {}", err),
    }
}

//! `<library_visual_scenes>`: the node hierarchy.
//!
//! The implicit root becomes the `<visual_scene>` itself; its children are
//! written depth-first. Walking the tree is also how we find meshes hung
//! under joints, so the walk reports those back to the caller.

use errors::{ErrorKind, Result};
use scene::{Mesh, NodeIdx};
use super::{geometry_id, morph_id, skeleton_root, skin_id, Ctx, Mode};
use super::relocate::{self, Relocation};
use super::xml::{Esc, Xml};

/// What the walk found out.
pub struct Walk {
    /// Meshes moved out from under joints, in the order they were found.
    pub relocations: Vec<Relocation>,
    /// Set when a mesh was found under a joint, whether or not it was
    /// relocated.
    pub compat_needed: bool,
}

pub fn library_visual_scenes(xml: &mut Xml, ctx: &Ctx) -> Result<Walk> {
    let root = ctx.scene.root();
    let mut walk = Walk { relocations: vec![], compat_needed: false };

    xml!(xml;
        <library_visual_scenes>;
            <visual_scene id=[(Esc(&root.name))] name=[(Esc(&root.name))]>;
    );

    for &child in &root.children {
        // Nodes relocated out of this subtree go in front of it, so write
        // the subtree off to the side first.
        let first_relocation = walk.relocations.len();
        let mut subtree = xml.fork();
        node(&mut subtree, ctx, child, &mut walk)?;

        for relocation in &walk.relocations[first_relocation..] {
            relocate::write_node(xml, ctx, relocation);
        }
        xml.append(subtree);
    }

    xml!(xml;
            /visual_scene>;
        /library_visual_scenes>;
    );

    Ok(walk)
}

fn node(xml: &mut Xml, ctx: &Ctx, idx: NodeIdx, walk: &mut Walk) -> Result<()> {
    let node = &ctx.scene.nodes[idx];
    let is_joint = ctx.index.is_joint(idx);

    if is_pruned(ctx, idx) {
        trace!("skipping empty node {}", node.name);
        return Ok(());
    }

    let parent_joint = ctx.index.parent(idx).filter(|&parent| ctx.index.is_joint(parent));
    if let Some(joint) = parent_joint {
        if let Some((attachment, _)) = node.meshes().next() {
            walk.compat_needed = true;
            if ctx.mode == Mode::Compat {
                // The node's children are left out of the document.
                let relocation = relocate::relocate(ctx, joint, idx, attachment)?;
                walk.relocations.push(relocation);
                return Ok(());
            }
        }
    }

    let name = Esc(&node.name);
    let ty = if is_joint { "JOINT" } else { "NODE" };
    xml!(xml;
        <node id=[(name)] sid=[(name)] name=[(name)] type=[(ty)]>;
            <matrix sid=["matrix"]>MATRIX(&node.local)</matrix>;
    );

    for (attachment, mesh) in node.meshes() {
        let mesh_id = match ctx.index.mesh_id(idx, attachment) {
            Some(id) => id,
            None => bail!(ErrorKind::MeshNotIndexed(node.name.clone(), attachment)),
        };
        instance(xml, ctx, mesh_id, mesh);
    }

    for &child in &node.children {
        self::node(xml, ctx, child, walk)?;
    }

    xml!(xml;
        /node>;
    );
    Ok(())
}

/// Whether `ignore_empty` leaves `idx` out of the document.
pub fn is_pruned(ctx: &Ctx, idx: NodeIdx) -> bool {
    let node = &ctx.scene.nodes[idx];
    ctx.opts.ignore_empty && !node.has_attachments() && !node.has_children() && !ctx.index.is_joint(idx)
}

fn instance(xml: &mut Xml, ctx: &Ctx, mesh_id: usize, mesh: &Mesh) {
    if !mesh.needs_controller() {
        xml!(xml;
            <instance_geometry url=["#"(geometry_id(mesh_id))]>;
        );
        bind_material(xml, mesh);
        xml!(xml;
            /instance_geometry>;
        );
        return;
    }

    let skinned = mesh.has_vertex_weights();
    let url = if skinned { skin_id(mesh_id) } else { morph_id(mesh_id) };
    xml!(xml;
        <instance_controller url=["#"(url)]>;
        if (skinned) {
            <skeleton>"#"(Esc(skeleton_root(ctx)))</skeleton>;
        }
    );
    bind_material(xml, mesh);
    xml!(xml;
        /instance_controller>;
    );
}

pub fn bind_material(xml: &mut Xml, mesh: &Mesh) {
    xml!(xml;
        <bind_material>;
            <technique_common>;
                <instance_material symbol=["defaultMaterial"] target=["#"(Esc(&mesh.material))]>;
                if (mesh.uv0.is_some()) {
                    <bind_vertex_input semantic=["CHANNEL0"] input_semantic=["TEXCOORD"] input_set=["0"]/>;
                }
                /instance_material>;
            /technique_common>;
        /bind_material>;
    );
}

#[test]
fn test_hierarchy() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let scene = fixtures::skinned_arm();
    let (out, compat_needed) = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        let walk = library_visual_scenes(&mut xml, ctx).unwrap();
        (xml.string(), walk.compat_needed)
    });
    assert!(!compat_needed);

    let lines = out.lines().map(|l| l.trim()).collect::<Vec<_>>();
    let pos = |prefix: &str| lines.iter().position(|l| l.starts_with(prefix)).unwrap();

    // Pre-order, with a node's instances before its children.
    assert!(pos(r#"<node id="root""#) < pos(r#"<node id="upper_arm""#));
    assert!(pos(r#"<node id="upper_arm""#) < pos(r#"<node id="lower_arm""#));
    assert!(pos(r#"<node id="lower_arm""#) < pos(r#"<node id="arm_mesh""#));
    assert!(pos(r#"<node id="arm_mesh""#) < pos("<instance_controller"));

    assert!(lines.contains(&r#"<visual_scene id="RootNode" name="RootNode">"#));
    assert!(lines.contains(&r#"<matrix sid="matrix">1 0 0 0 0 1 0 1 0 0 1 0 0 0 0 1</matrix>"#));
    assert!(lines.contains(&r#"<node id="root" sid="root" name="root" type="NODE">"#));
    assert_eq!(lines.iter().filter(|l| l.starts_with("<node ")).count(), 4);
    assert_eq!(lines.iter().filter(|l| **l == "</node>").count(), 4);
}

#[test]
fn test_joint_attachment_found_in_standard_mode() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let scene = fixtures::sword_in_hand();
    let (out, walk) = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        let walk = library_visual_scenes(&mut xml, ctx).unwrap();
        (xml.string(), (walk.compat_needed, walk.relocations.len()))
    });
    assert_eq!(walk, (true, 0));
    assert!(out.contains(r#"<node id="sword" sid="sword" name="sword" type="NODE">"#));
    assert!(out.contains(r##"<instance_geometry url="#meshId0">"##));
}

#[test]
fn test_uvless_mesh_has_no_vertex_input() {
    use convert::collada::test_ctx;
    use scene::{fixtures, Attachment};

    let mut scene = fixtures::plain_prop();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[2].attachments[0] {
        mesh.uv0 = None;
    }
    let out = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        library_visual_scenes(&mut xml, ctx).unwrap();
        xml.string()
    });
    assert!(out.contains(r##"<instance_material symbol="defaultMaterial" target="#body">"##));
    assert!(!out.contains("<bind_vertex_input"));
}

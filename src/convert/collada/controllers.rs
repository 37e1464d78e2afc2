//! `<library_controllers>`: skins, then morphs, then the skins made for
//! meshes relocated off joints.

use cgmath::{Matrix4, One};
use errors::Result;
use scene::index::MeshEntry;
use skin::SkinWeights;
use skin::bind_pose::inverse_bind_matrices;
use super::{geometry_id, morph_id, skin_id, Ctx, Mode};
use super::morph;
use super::relocate::{self, Relocation};
use super::xml::{Esc, Xml};

/// Everything that goes into a `<skin>`.
pub struct SkinData<'a> {
    pub mesh_id: usize,
    /// Id of the geometry or morph controller being skinned.
    pub source: String,
    pub bind_shape: Matrix4<f32>,
    pub joint_names: Vec<&'a str>,
    pub inv_binds: Vec<Matrix4<f32>>,
    pub weights: Vec<f32>,
    pub vcount: Vec<usize>,
    pub v: Vec<usize>,
}

pub fn library_controllers(
    xml: &mut Xml,
    ctx: &Ctx,
    relocations: &[Relocation],
) -> Result<()> {
    xml!(xml;
        <library_controllers>;
    );

    for (mesh_id, entry) in ctx.index.meshes.iter().enumerate() {
        if !entry.mesh.has_vertex_weights() {
            continue;
        }
        let data = skin_data(ctx, mesh_id, entry)?;
        skin(xml, &data);
    }

    for (mesh_id, entry) in ctx.index.meshes.iter().enumerate() {
        if !entry.mesh.has_morph_targets() {
            continue;
        }
        morph::morph_controller(xml, mesh_id, entry.mesh);
    }

    for relocation in relocations {
        let data = relocate::skin_data(ctx, relocation)?;
        skin(xml, &data);
    }

    xml!(xml;
        /library_controllers>;
    );
    Ok(())
}

fn skin_data<'a>(ctx: &Ctx<'a>, mesh_id: usize, entry: &MeshEntry<'a>) -> Result<SkinData<'a>> {
    let mesh = entry.mesh;
    let vertex_weights = match mesh.weights {
        Some(ref weights) => &weights[..],
        None => &[],
    };
    let remapped = SkinWeights::build(
        &geometry_id(mesh_id),
        vertex_weights,
        ctx.index.bone_nodes(),
    )?;
    let inv_binds = inverse_bind_matrices(ctx.scene, &remapped.joints, entry.owner)?;

    // A morphed mesh is skinned on top of its morph, except that Blender
    // only picks the morph targets up when the skin points at the bare
    // geometry.
    let source =
        if mesh.has_morph_targets() && ctx.mode == Mode::Standard {
            morph_id(mesh_id)
        } else {
            geometry_id(mesh_id)
        };

    debug!("{}: {} joints, {} influences",
        skin_id(mesh_id), remapped.joints.len(), remapped.weights.len());

    let scene = ctx.scene;
    Ok(SkinData {
        mesh_id,
        source,
        bind_shape: Matrix4::one(),
        joint_names: remapped.joints.iter().map(|&j| scene.nodes[j].name.as_str()).collect(),
        inv_binds,
        weights: remapped.weights,
        vcount: remapped.vcount,
        v: remapped.v,
    })
}

pub fn skin(xml: &mut Xml, data: &SkinData) {
    let id = skin_id(data.mesh_id);
    let num_joints = data.joint_names.len();
    let num_weights = data.weights.len();
    let num_verts = data.vcount.len();

    xml!(xml;
        <controller id=[(id)] name=[(id)]>;
            <skin source=["#"(data.source)]>;
                <bind_shape_matrix>MATRIX(&data.bind_shape)</bind_shape_matrix>;
                <source id=[(id)"-joints"] name=[(id)"-joints"]>;
                    <Name_array id=[(id)"-joints-array"] count=[(num_joints)]>
                        LIST(data.joint_names.iter().map(|name| Esc(name)))
                    </Name_array>;
                    <technique_common>;
                        <accessor source=["#"(id)"-joints-array"] count=[(num_joints)] stride=["1"]>;
                            <param name=["JOINT"] type=["Name"]/>;
                        /accessor>;
                    /technique_common>;
                /source>;
    );
    xml!(xml;
                <source id=[(id)"-bind-poses"] name=[(id)"-bind-poses"]>;
                    <float_array id=[(id)"-bind-poses-array"] count=[(16 * num_joints)]>
                        MATRICES(&data.inv_binds)
                    </float_array>;
                    <technique_common>;
                        <accessor source=["#"(id)"-bind-poses-array"] count=[(num_joints)] offset=["0"] stride=["16"]>;
                            <param name=["TRANSFORM"] type=["float4x4"]/>;
                        /accessor>;
                    /technique_common>;
                /source>;
                <source id=[(id)"-weights"] name=[(id)"-weights"]>;
                    <float_array id=[(id)"-weights-array"] count=[(num_weights)]>
                        LIST(&data.weights)
                    </float_array>;
                    <technique_common>;
                        <accessor source=["#"(id)"-weights-array"] count=[(num_weights)] offset=["0"] stride=["1"]>;
                            <param name=["WEIGHT"] type=["float"]/>;
                        /accessor>;
                    /technique_common>;
                /source>;
    );
    xml!(xml;
                <joints>;
                    <input semantic=["JOINT"] source=["#"(id)"-joints"]/>;
                    <input semantic=["INV_BIND_MATRIX"] source=["#"(id)"-bind-poses"]/>;
                /joints>;
                <vertex_weights count=[(num_verts)]>;
                    <input semantic=["JOINT"] source=["#"(id)"-joints"] offset=["0"]/>;
                    <input semantic=["WEIGHT"] source=["#"(id)"-weights"] offset=["1"]/>;
                    <vcount>LIST(&data.vcount)</vcount>;
                    <v>LIST(&data.v)</v>;
                /vertex_weights>;
            /skin>;
        /controller>;
    );
}

#[test]
fn test_skin_sources() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let scene = fixtures::skinned_arm();
    let out = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        library_controllers(&mut xml, ctx, &[]).unwrap();
        xml.string()
    });

    assert!(out.contains("<bind_shape_matrix>1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1</bind_shape_matrix>"));
    // upper_arm at (0, 1, 0), lower_arm at (1, 1, 0), mesh at the origin.
    assert!(out.contains(concat!(
        r#"<float_array id="meshId0-skin-bind-poses-array" count="32">"#,
        "1 0 0 0 0 1 0 -1 0 0 1 0 0 0 0 1 ",
        "1 0 0 -1 0 1 0 -1 0 0 1 0 0 0 0 1",
        "</float_array>",
    )));
    assert!(out.contains(r#"<vertex_weights count="3">"#));
    assert!(out.contains(r##"<input semantic="WEIGHT" source="#meshId0-skin-weights" offset="1"/>"##));
}

#[test]
fn test_bad_bone_is_fatal() {
    use convert::collada::test_ctx;
    use errors::ErrorKind;
    use scene::{fixtures, Attachment};

    let mut scene = fixtures::skinned_arm();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[4].attachments[0] {
        mesh.weights = Some(vec![fixtures::weight(&[(9, 1.0)]); 3]);
    }
    let err = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        library_controllers(&mut xml, ctx, &[]).err().unwrap()
    });
    match *err.kind() {
        ErrorKind::BoneOutOfRange(ref mesh, 9) => assert_eq!(mesh, "meshId0"),
        _ => panic!("unexpected error: {}", err),
    }
}

//! Writes a scene as a COLLADA 1.4.1 document.
//!
//! Each library has its own module; this one puts them together. The
//! visual scene is walked before anything else is written because the walk
//! is what finds meshes hung under joints, and in compatibility mode those
//! need controllers of their own in `<library_controllers>`.

#[macro_use]
mod xml;
mod effects;
mod geometry;
mod controllers;
mod morph;
mod relocate;
mod visual_scene;

use errors::Result;
use scene::{Scene, SceneIndex};
use self::xml::{Esc, Xml};

/// Which kind of document to write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// A faithful document.
    Standard,
    /// A document rearranged for importers (in practice, Blender's) that
    /// can't handle meshes parented to joints or morphs under skins.
    Compat,
}

/// Options that don't change between passes.
#[derive(Clone, Debug)]
pub struct GenOptions {
    /// Leave out nodes with no attachments, no children and no bone.
    pub ignore_empty: bool,
    /// Directory `<init_from>` paths are relative to.
    pub texture_dir: String,
    /// Used for both `<created>` and `<modified>`.
    pub timestamp: String,
}

pub struct Ctx<'a> {
    pub scene: &'a Scene,
    pub index: &'a SceneIndex<'a>,
    pub mode: Mode,
    pub opts: &'a GenOptions,
}

/// The result of one pass.
pub struct Document {
    pub mode: Mode,
    pub xml: String,
    /// Whether the scene has anything a compatibility document would need
    /// to rearrange.
    pub compat_needed: bool,
}

pub fn geometry_id(mesh_id: usize) -> String {
    format!("meshId{}", mesh_id)
}

pub fn skin_id(mesh_id: usize) -> String {
    format!("meshId{}-skin", mesh_id)
}

pub fn morph_id(mesh_id: usize) -> String {
    format!("meshId{}-morph", mesh_id)
}

pub fn morph_target_id(mesh_id: usize, target_idx: usize) -> String {
    format!("meshId{}_morphId{}", mesh_id, target_idx)
}

/// The node every `<skeleton>` points at: the first of the root's children
/// that makes it into the document.
pub fn skeleton_root<'a>(ctx: &Ctx<'a>) -> &'a str {
    let scene = ctx.scene;
    scene.root().children.iter()
        .find(|&&idx| !visual_scene::is_pruned(ctx, idx))
        .map(|&idx| scene.nodes[idx].name.as_str())
        .unwrap_or("root")
}

pub fn write(
    scene: &Scene,
    index: &SceneIndex,
    mode: Mode,
    opts: &GenOptions,
) -> Result<Document> {
    let ctx = Ctx { scene, index, mode, opts };

    let mut xml = Xml::with_capacity(1024 * 1024); // 1MiB

    xml!(xml;
        (r#"<?xml version="1.0" encoding="utf-8"?>"#);
        <COLLADA xmlns=["http://www.collada.org/2005/11/COLLADASchema"] version=["1.4.1"]>;
    );

    let mut visual_scenes = xml.fork();
    let walk = visual_scene::library_visual_scenes(&mut visual_scenes, &ctx)?;

    asset(&mut xml, &ctx);
    effects::library_images(&mut xml, &ctx);
    effects::library_effects(&mut xml, &ctx);
    effects::library_materials(&mut xml, &ctx);
    geometry::library_geometries(&mut xml, &ctx);
    controllers::library_controllers(&mut xml, &ctx, &walk.relocations)?;
    xml.append(visual_scenes);
    scene_instance(&mut xml, &ctx);

    xml!(xml;
        /COLLADA>;
    );

    let skinned_and_morphed = index.meshes.iter()
        .any(|entry| entry.mesh.has_vertex_weights() && entry.mesh.has_morph_targets());

    Ok(Document {
        mode,
        xml: xml.string(),
        compat_needed: walk.compat_needed || skinned_and_morphed,
    })
}

fn asset(xml: &mut Xml, ctx: &Ctx) {
    xml!(xml;
        <asset>;
            <contributor>;
                <authoring_tool>"skin2dae "(env!("CARGO_PKG_VERSION"))</authoring_tool>;
            /contributor>;
            <created>(ctx.opts.timestamp)</created>;
            <modified>(ctx.opts.timestamp)</modified>;
            <unit name=["meter"] meter=["1"]/>;
            <up_axis>"Y_UP"</up_axis>;
        /asset>;
    );
}

fn scene_instance(xml: &mut Xml, ctx: &Ctx) {
    xml!(xml;
        <scene>;
            <instance_visual_scene url=["#"(Esc(&ctx.scene.root().name))]/>;
        /scene>;
    );
}

#[cfg(test)]
pub fn test_options() -> GenOptions {
    GenOptions {
        ignore_empty: false,
        texture_dir: "scene_Textures".to_string(),
        timestamp: "2020-01-01T00:00:00Z".to_string(),
    }
}

/// Run `f` with a standard-mode context for `scene`.
#[cfg(test)]
pub fn test_ctx<T, F: FnOnce(&Ctx) -> T>(scene: &Scene, f: F) -> T {
    let index = SceneIndex::build(scene).unwrap();
    let opts = test_options();
    let ctx = Ctx { scene, index: &index, mode: Mode::Standard, opts: &opts };
    f(&ctx)
}

#[cfg(test)]
fn write_test_doc(scene: &Scene, mode: Mode) -> Result<Document> {
    let index = SceneIndex::build(scene).unwrap();
    write(scene, &index, mode, &test_options())
}

#[test]
fn test_document_is_deterministic() {
    use scene::fixtures;

    let scene = fixtures::morphing_face();
    let a = write_test_doc(&scene, Mode::Standard).unwrap();
    let b = write_test_doc(&scene, Mode::Standard).unwrap();
    assert_eq!(a.xml, b.xml);
}

#[test]
fn test_library_order() {
    use scene::fixtures;

    let doc = write_test_doc(&fixtures::skinned_arm(), Mode::Standard).unwrap();
    let libs = [
        "<asset>",
        "<library_images>",
        "<library_effects>",
        "<library_materials>",
        "<library_geometries>",
        "<library_controllers>",
        "<library_visual_scenes>",
        "<scene>",
    ];
    let positions = libs.iter()
        .map(|lib| doc.xml.find(lib).unwrap())
        .collect::<Vec<_>>();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert!(doc.xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    assert!(doc.xml.ends_with("</COLLADA>\n"));
    assert!(doc.xml.contains("<created>2020-01-01T00:00:00Z</created>"));
    assert!(doc.xml.contains("<up_axis>Y_UP</up_axis>"));
    assert!(doc.xml.contains(r##"<instance_visual_scene url="#RootNode"/>"##));
}

#[test]
fn test_skinned_arm_document() {
    use scene::fixtures;

    let doc = write_test_doc(&fixtures::skinned_arm(), Mode::Standard).unwrap();
    let xml = &doc.xml;

    assert!(!doc.compat_needed);
    assert!(xml.contains(r#"<controller id="meshId0-skin" name="meshId0-skin">"#));
    assert!(xml.contains(r##"<skin source="#meshId0">"##));
    assert!(xml.contains(
        r#"<Name_array id="meshId0-skin-joints-array" count="2">upper_arm lower_arm</Name_array>"#
    ));
    assert!(xml.contains(
        r#"<float_array id="meshId0-skin-weights-array" count="4">1 0.5 0.5 1</float_array>"#
    ));
    assert!(xml.contains("<vcount>1 2 1</vcount>"));
    assert!(xml.contains("<v>0 0 0 1 1 2 1 3</v>"));

    assert!(xml.contains(
        r#"<node id="upper_arm" sid="upper_arm" name="upper_arm" type="JOINT">"#
    ));
    assert!(xml.contains(r#"<node id="arm_mesh" sid="arm_mesh" name="arm_mesh" type="NODE">"#));
    assert!(xml.contains(r##"<instance_controller url="#meshId0-skin">"##));
    assert!(xml.contains("<skeleton>#root</skeleton>"));
    assert!(xml.contains(r##"<instance_material symbol="defaultMaterial" target="#body">"##));
    assert!(xml.contains(
        r#"<bind_vertex_input semantic="CHANNEL0" input_semantic="TEXCOORD" input_set="0"/>"#
    ));
    // The implicit root is the visual scene itself, not a node.
    assert!(!xml.contains(r#"<node id="RootNode""#));
}

#[test]
fn test_plain_mesh_uses_instance_geometry() {
    use scene::fixtures;

    let doc = write_test_doc(&fixtures::plain_prop(), Mode::Standard).unwrap();
    assert!(doc.xml.contains(r##"<instance_geometry url="#meshId0">"##));
    assert!(!doc.xml.contains("<instance_controller"));
    assert!(!doc.xml.contains("<controller "));
    assert!(!doc.xml.contains("<skeleton>"));
    assert!(!doc.compat_needed);
}

#[test]
fn test_ignore_empty() {
    use scene::fixtures;

    let scene = fixtures::plain_prop();
    let index = SceneIndex::build(&scene).unwrap();
    let mut opts = test_options();

    let doc = write(&scene, &index, Mode::Standard, &opts).unwrap();
    assert!(doc.xml.contains(r#"<node id="empty""#));

    opts.ignore_empty = true;
    let doc = write(&scene, &index, Mode::Standard, &opts).unwrap();
    assert!(!doc.xml.contains(r#"<node id="empty""#));
    assert!(doc.xml.contains(r#"<node id="prop""#));
}

#[test]
fn test_skeleton_skips_pruned_nodes() {
    use cgmath::{Matrix4, One};
    use scene::{fixtures, Node};

    // An empty node in front of the skeleton.
    let mut scene = fixtures::skinned_arm();
    let empty = scene.nodes.len();
    scene.nodes.push(Node::new("empty", Matrix4::one()));
    scene.nodes[0].children.insert(0, empty);
    scene.compute_world_transforms();
    let index = SceneIndex::build(&scene).unwrap();
    let mut opts = test_options();

    let doc = write(&scene, &index, Mode::Standard, &opts).unwrap();
    assert!(doc.xml.contains("<skeleton>#empty</skeleton>"));

    opts.ignore_empty = true;
    let doc = write(&scene, &index, Mode::Standard, &opts).unwrap();
    assert!(!doc.xml.contains(r#"<node id="empty""#));
    assert!(doc.xml.contains("<skeleton>#root</skeleton>"));
    assert!(!doc.xml.contains("<skeleton>#empty</skeleton>"));
}

#[test]
fn test_skinned_and_morphed() {
    use scene::fixtures;

    let scene = fixtures::morphing_face();
    let doc = write_test_doc(&scene, Mode::Standard).unwrap();
    assert!(doc.compat_needed);
    assert!(doc.xml.contains(r##"<skin source="#meshId0-morph">"##));
    assert!(doc.xml.contains(r##"<morph source="#meshId0" method="NORMALIZED">"##));
    assert!(doc.xml.contains(
        r#"<IDREF_array id="meshId0-targets-array" count="2">meshId0_morphId1 meshId0_morphId3</IDREF_array>"#
    ));
    assert!(doc.xml.contains(
        r#"<float_array id="meshId0-weights-array" count="2">0 0</float_array>"#
    ));
    // Weighted meshes are instanced through their skin.
    assert!(doc.xml.contains(r##"<instance_controller url="#meshId0-skin">"##));

    let compat = write_test_doc(&scene, Mode::Compat).unwrap();
    assert!(compat.xml.contains(r##"<skin source="#meshId0">"##));
    assert!(!compat.xml.contains(r##"<skin source="#meshId0-morph">"##));
    // The morph controller is still declared.
    assert!(compat.xml.contains(r#"<controller id="meshId0-morph" name="meshId0-morph">"#));
}

#[test]
fn test_morph_only_mesh() {
    use scene::{fixtures, Attachment};

    let mut scene = fixtures::morphing_face();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[3].attachments[0] {
        mesh.weights = None;
    }
    let doc = write_test_doc(&scene, Mode::Standard).unwrap();
    assert!(!doc.compat_needed);
    assert!(doc.xml.contains(r##"<instance_controller url="#meshId0-morph">"##));
    assert!(!doc.xml.contains("-skin"));
    assert!(!doc.xml.contains("<skeleton>"));
}

#[test]
fn test_only_degenerate_targets() {
    use scene::{fixtures, Attachment};

    let mut scene = fixtures::morphing_face();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[3].attachments[0] {
        mesh.morph_targets.retain(|t| t.is_degenerate());
        mesh.weights = None;
    }
    let doc = write_test_doc(&scene, Mode::Standard).unwrap();
    assert!(!doc.xml.contains("morphId"));
    assert!(!doc.xml.contains("<controller "));
    assert!(doc.xml.contains(r##"<instance_geometry url="#meshId0">"##));
}

#[test]
fn test_joint_attachment_standard() {
    use scene::fixtures;

    let doc = write_test_doc(&fixtures::sword_in_hand(), Mode::Standard).unwrap();
    assert!(doc.compat_needed);
    // Left where it is.
    assert!(doc.xml.contains(r##"<instance_geometry url="#meshId0">"##));
    assert!(!doc.xml.contains("<controller "));
}

#[test]
fn test_joint_attachment_relocated() {
    use scene::fixtures;

    let doc = write_test_doc(&fixtures::sword_in_hand(), Mode::Compat).unwrap();
    let xml = &doc.xml;

    assert!(doc.compat_needed);
    assert_eq!(xml.matches("<controller ").count(), 1);
    assert!(xml.contains(r#"<controller id="meshId0-skin" name="meshId0-skin">"#));
    assert!(xml.contains(r##"<skin source="#meshId0">"##));
    // The sword's world transform: hand (0, 1, 0) then sword (0, 0, 0.5).
    assert!(xml.contains(
        "<bind_shape_matrix>1 0 0 0 0 1 0 1 0 0 1 0.5 0 0 0 1</bind_shape_matrix>"
    ));
    assert!(xml.contains(
        r#"<Name_array id="meshId0-skin-joints-array" count="1">hand</Name_array>"#
    ));
    assert!(xml.contains(
        r#"<float_array id="meshId0-skin-weights-array" count="4">1 1 1 1</float_array>"#
    ));
    assert!(xml.contains("<vcount>1 1 1 1</vcount>"));
    assert!(xml.contains("<v>0 0 0 1 0 2 0 3</v>"));

    assert!(xml.contains(r##"<instance_controller url="#meshId0-skin">"##));
    assert!(!xml.contains("<instance_geometry"));
    assert_eq!(xml.matches(r#"<node id="sword""#).count(), 1);

    // The relocated node sits at the top level, ahead of the subtree it came
    // from.
    let sword = xml.find(r#"<node id="sword""#).unwrap();
    let root = xml.find(r#"<node id="root""#).unwrap();
    assert!(sword < root);
    let scene_start = xml.find("<visual_scene ").unwrap();
    let line = xml[..sword].rfind('\n').unwrap();
    let indent = sword - line - 1;
    let root_line = xml[..root].rfind('\n').unwrap();
    assert_eq!(indent, root - root_line - 1);
    assert!(scene_start < sword);
}

#[test]
fn test_relocated_node_loses_its_children() {
    use cgmath::{vec3, Matrix4};
    use scene::{fixtures, Node};

    let mut scene = fixtures::sword_in_hand();
    let gem = scene.nodes.len();
    scene.nodes.push(Node::new("gem", Matrix4::from_translation(vec3(0.0, 0.0, 1.0))));
    scene.nodes[3].children.push(gem);
    scene.compute_world_transforms();

    let doc = write_test_doc(&scene, Mode::Standard).unwrap();
    assert!(doc.xml.contains(r#"<node id="gem""#));

    let doc = write_test_doc(&scene, Mode::Compat).unwrap();
    assert!(doc.xml.contains(r#"<node id="sword""#));
    assert!(!doc.xml.contains(r#"<node id="gem""#));
}

#[test]
fn test_weighted_joint_attachment_fails() {
    use errors::ErrorKind;
    use scene::{fixtures, Attachment};

    let mut scene = fixtures::sword_in_hand();
    if let Attachment::Mesh(ref mut mesh) = scene.nodes[3].attachments[0] {
        mesh.weights = Some(vec![fixtures::weight(&[(0, 1.0)]); 4]);
    }

    // Fine in a standard document.
    assert!(write_test_doc(&scene, Mode::Standard).is_ok());

    let err = write_test_doc(&scene, Mode::Compat).err().unwrap();
    match *err.kind() {
        ErrorKind::JointAttachmentWeighted(ref node) => assert_eq!(node, "sword"),
        _ => panic!("unexpected error: {}", err),
    }
}

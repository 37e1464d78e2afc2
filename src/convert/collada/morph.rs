//! Morph controllers.
//!
//! Only live targets are listed. Their ids keep the target's original
//! index, so a mesh whose targets 0 and 2 are degenerate lists `_morphId1`
//! and `_morphId3`.

use scene::Mesh;
use super::{geometry_id, morph_id, morph_target_id};
use super::xml::Xml;

pub fn morph_controller(xml: &mut Xml, mesh_id: usize, mesh: &Mesh) {
    let id = morph_id(mesh_id);
    let targets = mesh.live_morph_targets()
        .map(|(target_idx, _)| morph_target_id(mesh_id, target_idx))
        .collect::<Vec<_>>();
    let num_targets = targets.len();
    let mesh_id = geometry_id(mesh_id);

    debug!("{}: {} of {} morph targets kept",
        id, num_targets, mesh.morph_targets.len());

    xml!(xml;
        <controller id=[(id)] name=[(id)]>;
            <morph source=["#"(mesh_id)] method=["NORMALIZED"]>;
                <source id=[(mesh_id)"-targets"]>;
                    <IDREF_array id=[(mesh_id)"-targets-array"] count=[(num_targets)]>
                        LIST(&targets)
                    </IDREF_array>;
                    <technique_common>;
                        <accessor source=["#"(mesh_id)"-targets-array"] count=[(num_targets)] stride=["1"]>;
                            <param name=["IDREF"] type=["IDREF"]/>;
                        /accessor>;
                    /technique_common>;
                /source>;
                <source id=[(mesh_id)"-weights"]>;
                    <float_array id=[(mesh_id)"-weights-array"] count=[(num_targets)]>
                        LIST(targets.iter().map(|_| 0))
                    </float_array>;
                    <technique_common>;
                        <accessor source=["#"(mesh_id)"-weights-array"] count=[(num_targets)] stride=["1"]>;
                            <param name=["WEIGHT"] type=["float"]/>;
                        /accessor>;
                    /technique_common>;
                /source>;
                <targets>;
                    <input semantic=["MORPH_TARGET"] source=["#"(mesh_id)"-targets"]/>;
                    <input semantic=["MORPH_WEIGHT"] source=["#"(mesh_id)"-weights"]/>;
                /targets>;
            /morph>;
        /controller>;
    );
}

#[test]
fn test_morph_controller() {
    use scene::{fixtures, Attachment};

    let scene = fixtures::morphing_face();
    let mesh = match scene.nodes[3].attachments[0] {
        Attachment::Mesh(ref mesh) => mesh,
        _ => unreachable!(),
    };
    let mut xml = Xml::with_capacity(4096);
    morph_controller(&mut xml, 2, mesh);
    let out = xml.string();

    assert!(out.contains(r#"<controller id="meshId2-morph" name="meshId2-morph">"#));
    assert!(out.contains(
        r#"<IDREF_array id="meshId2-targets-array" count="2">meshId2_morphId1 meshId2_morphId3</IDREF_array>"#
    ));
    assert!(out.contains(r#"<float_array id="meshId2-weights-array" count="2">0 0</float_array>"#));
    assert!(out.contains(r##"<input semantic="MORPH_WEIGHT" source="#meshId2-weights"/>"##));
    assert!(!out.contains("morphId0"));
    assert!(!out.contains("morphId2"));
}

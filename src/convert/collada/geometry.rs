//! `<library_geometries>`: one geometry per mesh, plus one per live morph
//! target.

use cgmath::Vector3;
use scene::Mesh;
use super::{geometry_id, morph_target_id, Ctx};
use super::xml::Xml;

pub fn library_geometries(xml: &mut Xml, ctx: &Ctx) {
    xml!(xml;
        <library_geometries>;
    );
    for (mesh_id, entry) in ctx.index.meshes.iter().enumerate() {
        let mesh = entry.mesh;
        geometry(xml, mesh, &geometry_id(mesh_id), None);

        for (target_idx, target) in mesh.live_morph_targets() {
            let id = morph_target_id(mesh_id, target_idx);
            geometry(xml, mesh, &id, Some(&target.offsets));
        }
    }
    xml!(xml;
        /library_geometries>;
    );
}

/// Writes a mesh as a geometry, optionally displaced by a morph target's
/// offsets.
fn geometry(xml: &mut Xml, mesh: &Mesh, id: &str, offsets: Option<&[Vector3<f32>]>) {
    xml!(xml;
        <geometry id=[(id)] name=[(id)]>;
            <mesh>;
    );

    let positions = mesh.vertices.iter().enumerate()
        .map(|(i, &p)| match offsets {
            Some(offsets) => p + offsets[i],
            None => p,
        })
        .flat_map(|p| vec![p.x, p.y, p.z]);
    float_source(xml, id, "positions", positions, &["X", "Y", "Z"]);

    let normals = mesh.normals.iter().flat_map(|n| vec![n.x, n.y, n.z]);
    float_source(xml, id, "normals", normals, &["X", "Y", "Z"]);

    if let Some(ref uv0) = mesh.uv0 {
        // Flip V; the scene has its origin in the top-left.
        let texcoords = uv0.iter().flat_map(|t| vec![t.x, 1.0 - t.y]);
        float_source(xml, id, "tex0", texcoords, &["S", "T"]);
    }

    let num_tris = mesh.triangles.len();
    xml!(xml;
        <vertices id=[(id)"-vertices"]>;
            <input semantic=["POSITION"] source=["#"(id)"-positions"]/>;
        /vertices>;
        <polylist material=["defaultMaterial"] count=[(num_tris)]>;
            <input semantic=["VERTEX"] source=["#"(id)"-vertices"] offset=["0"]/>;
            <input semantic=["NORMAL"] source=["#"(id)"-normals"] offset=["0"]/>;
            if (mesh.uv0.is_some()) {
                <input semantic=["TEXCOORD"] source=["#"(id)"-tex0"] offset=["0"]/>;
            }
            <vcount>LIST(mesh.triangles.iter().map(|_| 3))</vcount>;
            <p>LIST(mesh.triangles.iter().flat_map(|tri| tri.iter()))</p>;
        /polylist>;
    );

    xml!(xml;
            /mesh>;
        /geometry>;
    );
}

/// A `<source>` of floats with the given component names.
fn float_source<I>(xml: &mut Xml, id: &str, kind: &str, values: I, params: &[&str])
where I: Iterator<Item = f32> {
    let values = values.collect::<Vec<f32>>();
    let stride = params.len();
    xml!(xml;
        <source id=[(id)"-"(kind)] name=[(id)"-"(kind)]>;
            <float_array id=[(id)"-"(kind)"-array"] count=[(values.len())]>LIST(&values)</float_array>;
            <technique_common>;
                <accessor source=["#"(id)"-"(kind)"-array"] count=[(values.len() / stride)] offset=["0"] stride=[(stride)]>;
                for param in (params) {
                    <param name=[(param)] type=["float"]/>;
                }
                /accessor>;
            /technique_common>;
        /source>;
    );
}

#[test]
fn test_geometry() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let scene = fixtures::plain_prop();
    let out = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        library_geometries(&mut xml, ctx);
        xml.string()
    });

    assert!(out.contains(r#"<geometry id="meshId0" name="meshId0">"#));
    assert!(out.contains(
        r#"<float_array id="meshId0-positions-array" count="9">0 0 0 1 0 0 2 0 0</float_array>"#
    ));
    assert!(out.contains(
        r#"<float_array id="meshId0-tex0-array" count="6">0 0.75 0.25 0.75 0.5 0.75</float_array>"#
    ));
    assert!(out.contains(r##"<input semantic="TEXCOORD" source="#meshId0-tex0" offset="0"/>"##));
    assert!(out.contains(r#"<polylist material="defaultMaterial" count="1">"#));
    assert!(out.contains("<vcount>3</vcount>"));
    assert!(out.contains("<p>0 1 2</p>"));
}

#[test]
fn test_morph_target_geometry() {
    use convert::collada::test_ctx;
    use scene::fixtures;

    let scene = fixtures::morphing_face();
    let out = test_ctx(&scene, |ctx| {
        let mut xml = Xml::with_capacity(4096);
        library_geometries(&mut xml, ctx);
        xml.string()
    });

    // Targets 0 and 2 are degenerate and dropped without renumbering.
    assert!(!out.contains("meshId0_morphId0"));
    assert!(!out.contains("meshId0_morphId2"));
    assert!(out.contains(r#"<geometry id="meshId0_morphId1" name="meshId0_morphId1">"#));
    assert!(out.contains(r#"<geometry id="meshId0_morphId3" name="meshId0_morphId3">"#));
    assert_eq!(out.matches("<geometry ").count(), 3);

    // Target positions are displaced base positions.
    assert!(out.contains(
        r#"<float_array id="meshId0_morphId1-positions-array" count="9">0 0.5 0 1 0.5 0 2 0.5 0</float_array>"#
    ));
    assert!(out.contains(
        r#"<float_array id="meshId0_morphId3-positions-array" count="9">0 0 0 1 0 0 2 0 1</float_array>"#
    ));
}

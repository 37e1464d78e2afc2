//! Reads a scene from its JSON description.
//!
//! ```text
//! {
//!   "nodes": [{ "name", "matrix"?, "children"?, "attachments"? }, ...],
//!   "bones": [{ "node" }, ...],
//!   "materials": [{ "name", "ambient"?, "diffuse"?, "specular"?,
//!                   "emissive"?, "maps"?: { kind: texture name },
//!                   "flags"?: [kind, ...] }, ...],
//!   "textures": [{ "name", "file" }, ...]
//! }
//! ```
//!
//! Matrices are 16 numbers, one row after another, for column vectors. Node
//! 0 is the root. Texture files are relative to the description.

use cgmath::{vec2, vec3, Matrix, Matrix4, One, Vector2, Vector3, Vector4};
use errors::{ErrorKind, Result};
use json::{self, JsonValue};
use scene::*;
use smallvec::SmallVec;
use std::fs;
use std::io;
use std::path::Path;

pub fn load(path: &Path) -> Result<Scene> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
            bail!(ErrorKind::InputNotFound(path.display().to_string()))
        }
        Err(e) => bail!(ErrorKind::BadScene(format!("couldn't read {}: {}", path.display(), e))),
    };
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    from_str(&text, |file| {
        let file_path = dir.join(file);
        match fs::read(&file_path) {
            Ok(data) => Ok(data),
            Err(e) => bail!(ErrorKind::BadScene(
                format!("couldn't read texture {}: {}", file_path.display(), e)
            )),
        }
    })
}

/// Parse a scene. `read_file` fetches the bytes of a texture file.
pub fn from_str<F>(text: &str, mut read_file: F) -> Result<Scene>
where F: FnMut(&str) -> Result<Vec<u8>> {
    let root = json::parse(text)?;
    check!(root.is_object(), "top level is not an object")?;

    let mut nodes = vec![];
    for (idx, node) in root["nodes"].members().enumerate() {
        nodes.push(context(read_node(node), || format!("node {}", idx))?);
    }

    let mut bones = vec![];
    for bone in root["bones"].members() {
        bones.push(Bone { node: usize_field(bone, "node")? });
    }

    let mut materials = vec![];
    for mat in root["materials"].members() {
        materials.push(read_material(mat)?);
    }

    let mut textures = vec![];
    for tex in root["textures"].members() {
        let name = str_field(tex, "name")?.to_string();
        let data = read_file(str_field(tex, "file")?)?;
        textures.push(Texture { name, data });
    }

    let mut scene = Scene { nodes, bones, materials, textures };

    // Catches out-of-range and repeated children before we walk the tree.
    SceneIndex::build(&scene)?;
    scene.compute_world_transforms();

    Ok(scene)
}

fn read_node(v: &JsonValue) -> Result<Node> {
    let name = str_field(v, "name")?;
    let local =
        if v["matrix"].is_null() {
            Matrix4::one()
        } else {
            matrix(&v["matrix"])?
        };
    let mut node = Node::new(name, local);

    for child in v["children"].members() {
        node.children.push(as_usize(child, "child")?);
    }

    for (idx, attachment) in v["attachments"].members().enumerate() {
        let attachment = match attachment["type"].as_str() {
            Some("mesh") => Attachment::Mesh(
                context(read_mesh(attachment), || format!("attachment {} of {}", idx, name))?
            ),
            Some("morph") => Attachment::Morph,
            _ => bail!(ErrorKind::BadScene(
                format!("attachment {} of {} has an unknown type", idx, name)
            )),
        };
        node.attachments.push(attachment);
    }

    Ok(node)
}

fn read_mesh(v: &JsonValue) -> Result<Mesh> {
    let vertices = vec3s(&v["vertices"], "vertices")?;
    let num_verts = vertices.len();

    let normals = vec3s(&v["normals"], "normals")?;
    check!(normals.len() == num_verts, "{} normals for {} vertices", normals.len(), num_verts)?;

    let uv0 =
        if v["uv0"].is_null() {
            None
        } else {
            let uv0 = vec2s(&v["uv0"], "uv0")?;
            check!(uv0.len() == num_verts, "{} UVs for {} vertices", uv0.len(), num_verts)?;
            Some(uv0)
        };

    let mut triangles = Vec::with_capacity(v["triangles"].len());
    for tri in v["triangles"].members() {
        let is = indices(tri, 3, "triangle")?;
        let mut idx = [0u32; 3];
        for i in 0..3 {
            check!(is[i] < num_verts, "triangle index {} out of range", is[i])?;
            idx[i] = is[i] as u32;
        }
        triangles.push(idx);
    }

    let weights =
        if v["weights"].is_null() {
            None
        } else {
            let mut weights = Vec::with_capacity(num_verts);
            for vw in v["weights"].members() {
                check!(vw.len() <= 4, "a vertex has more than 4 weights")?;
                let mut slots = SmallVec::new();
                for slot in vw.members() {
                    let bone = as_usize(&slot[0], "bone")?;
                    let weight = as_f32(&slot[1], "weight")?;
                    slots.push(Influence { bone, weight });
                }
                weights.push(VertexWeight { slots });
            }
            check!(weights.len() == num_verts,
                "{} weight records for {} vertices", weights.len(), num_verts)?;
            Some(weights)
        };

    let mut morph_targets = vec![];
    for target in v["morph_targets"].members() {
        let offsets = vec3s(target, "morph target")?;
        check!(offsets.len() == num_verts,
            "morph target has {} offsets for {} vertices", offsets.len(), num_verts)?;
        morph_targets.push(MorphTarget { offsets });
    }

    let material = str_field(v, "material")?.to_string();

    Ok(Mesh { vertices, normals, uv0, triangles, weights, morph_targets, material })
}

fn read_material(v: &JsonValue) -> Result<Material> {
    let mut mat = Material::new(str_field(v, "name")?);

    mat.ambient = color_field(v, "ambient", mat.ambient)?;
    mat.diffuse = color_field(v, "diffuse", mat.diffuse)?;
    mat.specular = color_field(v, "specular", mat.specular)?;
    mat.emissive = color_field(v, "emissive", mat.emissive)?;

    for (kind, texture) in v["maps"].entries() {
        let kind = map_kind(&mat.name, kind)?;
        match texture.as_str() {
            Some(texture) => mat.set_map(kind, texture),
            None => bail!(ErrorKind::BadScene(
                format!("{} map of material {} should be a texture name", kind.name(), mat.name)
            )),
        }
    }
    // Flags can also be raised without a texture to go with them.
    for flag in v["flags"].members() {
        let kind = match flag.as_str() {
            Some(name) => map_kind(&mat.name, name)?,
            None => bail!(ErrorKind::BadScene(format!("bad flag on material {}", mat.name))),
        };
        mat.flags.insert(kind);
    }

    Ok(mat)
}

fn map_kind(material: &str, name: &str) -> Result<MapKind> {
    match MapKind::from_name(name) {
        Some(kind) => Ok(kind),
        None => bail!(ErrorKind::BadScene(
            format!("material {} has an unknown map kind {}", material, name)
        )),
    }
}

/// Prefix the message of a `BadScene` error with where it happened.
fn context<T, F>(res: Result<T>, f: F) -> Result<T>
where F: FnOnce() -> String {
    res.map_err(|e| {
        let msg = match *e.kind() {
            ErrorKind::BadScene(ref msg) => Some(format!("{}: {}", f(), msg)),
            _ => None,
        };
        match msg {
            Some(msg) => ErrorKind::BadScene(msg).into(),
            None => e,
        }
    })
}

fn matrix(v: &JsonValue) -> Result<Matrix4<f32>> {
    let m = floats(v, 16, "matrix")?;
    // Matrix4::new takes columns; we have rows.
    Ok(Matrix4::new(
        m[0], m[1], m[2], m[3],
        m[4], m[5], m[6], m[7],
        m[8], m[9], m[10], m[11],
        m[12], m[13], m[14], m[15],
    ).transpose())
}

fn color_field(v: &JsonValue, key: &str, default: Vector4<f32>) -> Result<Vector4<f32>> {
    if v[key].is_null() {
        return Ok(default);
    }
    let c = floats(&v[key], 4, key)?;
    Ok(Vector4::new(c[0], c[1], c[2], c[3]))
}

fn vec3s(v: &JsonValue, what: &str) -> Result<Vec<Vector3<f32>>> {
    v.members()
        .map(|p| floats(p, 3, what).map(|p| vec3(p[0], p[1], p[2])))
        .collect()
}

fn vec2s(v: &JsonValue, what: &str) -> Result<Vec<Vector2<f32>>> {
    v.members()
        .map(|p| floats(p, 2, what).map(|p| vec2(p[0], p[1])))
        .collect()
}

/// Exactly `n` numbers.
fn floats(v: &JsonValue, n: usize, what: &str) -> Result<Vec<f32>> {
    check!(v.is_array() && v.len() == n, "{} should be a list of {} numbers", what, n)?;
    v.members().map(|x| as_f32(x, what)).collect()
}

/// Exactly `n` non-negative integers.
fn indices(v: &JsonValue, n: usize, what: &str) -> Result<Vec<usize>> {
    check!(v.is_array() && v.len() == n, "{} should be a list of {} indices", what, n)?;
    v.members().map(|x| as_usize(x, what)).collect()
}

fn as_f32(v: &JsonValue, what: &str) -> Result<f32> {
    match v.as_f32() {
        Some(x) => Ok(x),
        None => bail!(ErrorKind::BadScene(format!("{} should be a number", what))),
    }
}

fn as_usize(v: &JsonValue, what: &str) -> Result<usize> {
    match v.as_usize() {
        Some(x) => Ok(x),
        None => bail!(ErrorKind::BadScene(format!("{} should be a non-negative integer", what))),
    }
}

fn usize_field(v: &JsonValue, key: &str) -> Result<usize> {
    as_usize(&v[key], key)
}

fn str_field<'a>(v: &'a JsonValue, key: &str) -> Result<&'a str> {
    match v[key].as_str() {
        Some(s) => Ok(s),
        None => bail!(ErrorKind::BadScene(format!("missing string field \"{}\"", key))),
    }
}

#[cfg(test)]
static ARM_JSON: &str = r#"{
    "nodes": [
        { "name": "RootNode", "children": [1] },
        { "name": "root", "children": [2, 3] },
        { "name": "hand", "matrix": [1,0,0,0, 0,1,0,1, 0,0,1,0, 0,0,0,1], "children": [] },
        { "name": "arm", "attachments": [
            { "type": "morph" },
            { "type": "mesh", "material": "skin",
              "vertices": [[0,0,0], [1,0,0], [0,1,0]],
              "normals": [[0,0,1], [0,0,1], [0,0,1]],
              "uv0": [[0,0], [1,0], [0,1]],
              "triangles": [[0,1,2]],
              "weights": [[[0, 1.0]], [[0, 0.5], [0, 0.0]], [[0, 1]]],
              "morph_targets": [[[0,0,0], [0,0,0], [0,0,0]]] }
        ] }
    ],
    "bones": [{ "node": 2 }],
    "materials": [
        { "name": "skin", "diffuse": [1, 0.5, 0.5, 1], "maps": { "diffuse": "skin.dds" },
          "flags": ["glow"] }
    ],
    "textures": [{ "name": "skin.dds", "file": "tex/skin.dds" }]
}"#;

#[test]
fn test_load_scene() {
    let mut files = vec![];
    let scene = from_str(ARM_JSON, |file| {
        files.push(file.to_string());
        Ok(vec![0xDD, 0x5])
    }).unwrap();

    assert_eq!(files, vec!["tex/skin.dds".to_string()]);
    assert_eq!(scene.nodes.len(), 4);
    assert_eq!(scene.nodes[1].children, vec![2, 3]);
    assert_eq!(scene.nodes[2].world, Matrix4::from_translation(vec3(0.0, 1.0, 0.0)));
    assert_eq!(scene.bones[0].node, 2);

    let node = &scene.nodes[3];
    assert_eq!(node.attachments.len(), 2);
    let (attachment, mesh) = node.meshes().next().unwrap();
    assert_eq!(attachment, 1);
    assert_eq!(mesh.material, "skin");
    assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
    assert!(mesh.has_vertex_weights());
    assert_eq!(mesh.weights.as_ref().unwrap()[1].slots.len(), 2);
    // The only target is all zeros.
    assert_eq!(mesh.morph_targets.len(), 1);
    assert!(!mesh.has_morph_targets());

    let mat = &scene.materials[0];
    assert_eq!(mat.diffuse, Vector4::new(1.0, 0.5, 0.5, 1.0));
    assert_eq!(mat.ambient, Vector4::new(0.0, 0.0, 0.0, 1.0));
    assert_eq!(mat.map(MapKind::Diffuse), Some("skin.dds"));
    assert!(mat.flags.has(MapKind::Glow));
    assert_eq!(mat.map(MapKind::Glow), None);

    assert_eq!(scene.textures[0].name, "skin.dds");
    assert_eq!(scene.textures[0].data, vec![0xDD, 0x5]);
}

#[test]
fn test_malformed_scenes() {
    fn err_msg(json: &str) -> String {
        let err = from_str(json, |_| Ok(vec![])).err().unwrap();
        assert!(err.is_user_error(), "not a user error: {}", err);
        err.to_string()
    }

    err_msg("{ nope");
    err_msg("[]");
    assert!(err_msg(r#"{ "nodes": [{ "name": "a", "children": [5] }] }"#).contains("does not exist"));
    assert!(err_msg(r#"{ "nodes": [{ "name": "a", "matrix": [1, 2] }] }"#).contains("matrix"));

    let msg = err_msg(r#"{ "nodes": [{ "name": "a", "attachments": [
        { "type": "mesh", "material": "m", "vertices": [[0,0,0]], "normals": [] }
    ] }] }"#);
    assert!(msg.contains("node 0"));
    assert!(msg.contains("0 normals for 1 vertices"));

    let msg = err_msg(r#"{ "nodes": [{ "name": "a", "attachments": [
        { "type": "mesh", "material": "m", "vertices": [[0,0,0]], "normals": [[0,0,1]],
          "triangles": [[0, 0, 1]] }
    ] }] }"#);
    assert!(msg.contains("out of range"));

    // Indices are integers, not rounded floats.
    let msg = err_msg(r#"{ "nodes": [{ "name": "a", "attachments": [
        { "type": "mesh", "material": "m", "vertices": [[0,0,0]], "normals": [[0,0,1]],
          "triangles": [[0, 0, 16777217]] }
    ] }] }"#);
    assert!(msg.contains("triangle index 16777217 out of range"), "{}", msg);

    let msg = err_msg(r#"{ "nodes": [{ "name": "a", "attachments": [
        { "type": "mesh", "material": "m", "vertices": [[0,0,0]], "normals": [[0,0,1]],
          "triangles": [[0, 0, 0.5]] }
    ] }] }"#);
    assert!(msg.contains("triangle should be a non-negative integer"), "{}", msg);

    let msg = err_msg(r#"{ "nodes": [{ "name": "a" }],
        "materials": [{ "name": "m", "maps": { "sparkle": "s.dds" } }] }"#);
    assert!(msg.contains("unknown map kind sparkle"));
}

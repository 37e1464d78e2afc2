//! The in-memory scene graph handed to the converter.
//!
//! Everything here is read-only once loaded. Nodes live in a flat arena;
//! node 0 is the implicit root, which is never written out itself.
//!
//! Matrices use cgmath's column-vector convention: a node's world transform
//! is `parent.world * node.local`.

pub mod index;
pub mod load;
#[cfg(test)]
pub mod fixtures;

use cgmath::{Matrix4, One, Vector2, Vector3, Vector4, Zero};
use smallvec::SmallVec;

pub use self::index::SceneIndex;

pub type NodeIdx = usize;
pub type BoneIdx = usize;

pub struct Scene {
    pub nodes: Vec<Node>,
    pub bones: Vec<Bone>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
}

pub struct Node {
    pub name: String,
    pub local: Matrix4<f32>,
    /// Derived from the hierarchy by `Scene::compute_world_transforms`.
    pub world: Matrix4<f32>,
    pub children: Vec<NodeIdx>,
    pub attachments: Vec<Attachment>,
}

pub enum Attachment {
    Mesh(Mesh),
    /// Default weights for morph targets. Carries nothing we write.
    Morph,
}

pub struct Bone {
    pub node: NodeIdx,
}

pub struct Mesh {
    pub vertices: Vec<Vector3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub uv0: Option<Vec<Vector2<f32>>>,
    pub triangles: Vec<[u32; 3]>,
    /// One record per vertex.
    pub weights: Option<Vec<VertexWeight>>,
    pub morph_targets: Vec<MorphTarget>,
    pub material: String,
}

/// Up to four bone influences on a single vertex. Slots with a zero weight
/// are unused.
#[derive(Clone, Default)]
pub struct VertexWeight {
    pub slots: SmallVec<[Influence; 4]>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Influence {
    pub bone: BoneIdx,
    pub weight: f32,
}

pub struct MorphTarget {
    pub offsets: Vec<Vector3<f32>>,
}

pub struct Texture {
    pub name: String,
    pub data: Vec<u8>,
}

/// Whether a texture called `name` can be written into the texture
/// directory. Names with a directory part in them can't.
pub fn is_plain_file_name(name: &str) -> bool {
    use std::path::Path;
    Path::new(name).file_name().and_then(|s| s.to_str()) == Some(name)
}

pub struct Material {
    pub name: String,
    pub flags: MaterialFlags,
    pub ambient: Vector4<f32>,
    pub diffuse: Vector4<f32>,
    pub specular: Vector4<f32>,
    pub emissive: Vector4<f32>,
    /// Texture name for each map kind, indexed by `MapKind as usize`.
    pub maps: [Option<String>; NUM_MAP_KINDS],
}

pub const NUM_MAP_KINDS: usize = 9;

/// The kinds of texture map a material can have, in output order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKind {
    Diffuse,
    Normal,
    Specular,
    Reflection,
    Highlight,
    Glow,
    Night,
    Detail,
    Shadow,
}

impl MapKind {
    pub const ALL: [MapKind; NUM_MAP_KINDS] = [
        MapKind::Diffuse,
        MapKind::Normal,
        MapKind::Specular,
        MapKind::Reflection,
        MapKind::Highlight,
        MapKind::Glow,
        MapKind::Night,
        MapKind::Detail,
        MapKind::Shadow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MapKind::Diffuse => "diffuse",
            MapKind::Normal => "normal",
            MapKind::Specular => "specular",
            MapKind::Reflection => "reflection",
            MapKind::Highlight => "highlight",
            MapKind::Glow => "glow",
            MapKind::Night => "night",
            MapKind::Detail => "detail",
            MapKind::Shadow => "shadow",
        }
    }

    pub fn from_name(name: &str) -> Option<MapKind> {
        MapKind::ALL.iter().cloned().find(|kind| kind.name() == name)
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialFlags(pub u32);

impl MaterialFlags {
    pub fn has(self, kind: MapKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: MapKind) {
        self.0 |= kind.bit();
    }
}

impl Scene {
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Fill in every node's world transform from the local transforms,
    /// starting at the root.
    pub fn compute_world_transforms(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        self.nodes[0].world = self.nodes[0].local;
        let mut stack = vec![0];
        while let Some(parent) = stack.pop() {
            let parent_world = self.nodes[parent].world;
            let children = self.nodes[parent].children.clone();
            for child in children {
                let local = self.nodes[child].local;
                self.nodes[child].world = parent_world * local;
                stack.push(child);
            }
        }
    }
}

impl Node {
    pub fn new(name: &str, local: Matrix4<f32>) -> Node {
        Node {
            name: name.to_string(),
            local,
            world: Matrix4::one(),
            children: vec![],
            attachments: vec![],
        }
    }

    pub fn meshes<'a>(&'a self) -> impl Iterator<Item = (usize, &'a Mesh)> + 'a {
        self.attachments.iter().enumerate()
            .filter_map(|(i, attachment)| match *attachment {
                Attachment::Mesh(ref mesh) => Some((i, mesh)),
                Attachment::Morph => None,
            })
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_vertex_weights(&self) -> bool {
        self.weights.as_ref().map(|w| !w.is_empty()).unwrap_or(false)
    }

    /// Whether any morph target survives degenerate-target filtering.
    pub fn has_morph_targets(&self) -> bool {
        self.morph_targets.iter().any(|t| !t.is_degenerate())
    }

    /// Non-degenerate morph targets, paired with their original index.
    pub fn live_morph_targets<'a>(&'a self) -> impl Iterator<Item = (usize, &'a MorphTarget)> + 'a {
        self.morph_targets.iter().enumerate()
            .filter(|&(_, target)| !target.is_degenerate())
    }

    /// Meshes with skinning or morphing are instanced through a controller.
    pub fn needs_controller(&self) -> bool {
        self.has_vertex_weights() || self.has_morph_targets()
    }
}

impl MorphTarget {
    /// A target that doesn't move any vertex.
    pub fn is_degenerate(&self) -> bool {
        self.offsets.iter().all(|o| *o == Vector3::zero())
    }
}

impl Material {
    pub fn new(name: &str) -> Material {
        Material {
            name: name.to_string(),
            flags: MaterialFlags::default(),
            ambient: Vector4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vector4::new(1.0, 1.0, 1.0, 1.0),
            specular: Vector4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vector4::new(0.0, 0.0, 0.0, 1.0),
            maps: Default::default(),
        }
    }

    pub fn set_map(&mut self, kind: MapKind, texture: &str) {
        self.flags.insert(kind);
        self.maps[kind as usize] = Some(texture.to_string());
    }

    pub fn map(&self, kind: MapKind) -> Option<&str> {
        self.maps[kind as usize].as_ref().map(|s| s.as_str())
    }
}

#[test]
fn test_plain_file_names() {
    assert!(is_plain_file_name("body_d.dds"));
    assert!(!is_plain_file_name("../evil.dds"));
    assert!(!is_plain_file_name("sub/body_d.dds"));
    assert!(!is_plain_file_name(".."));
    assert!(!is_plain_file_name(""));
}

#[test]
fn test_degenerate_targets() {
    let zero = MorphTarget { offsets: vec![Vector3::zero(); 3] };
    let live = MorphTarget {
        offsets: vec![Vector3::zero(), Vector3::new(0.0, 0.25, 0.0), Vector3::zero()],
    };
    assert!(zero.is_degenerate());
    assert!(!live.is_degenerate());

    let mesh = Mesh {
        vertices: vec![Vector3::zero(); 3],
        normals: vec![Vector3::unit_y(); 3],
        uv0: None,
        triangles: vec![[0, 1, 2]],
        weights: None,
        morph_targets: vec![zero, live, MorphTarget { offsets: vec![Vector3::zero(); 3] }],
        material: "m".to_string(),
    };
    assert!(mesh.has_morph_targets());
    let ids = mesh.live_morph_targets().map(|(i, _)| i).collect::<Vec<_>>();
    assert_eq!(ids, vec![1]);
}

#[test]
fn test_world_transforms() {
    use cgmath::vec3;
    let mut a = Node::new("a", Matrix4::one());
    let mut b = Node::new("b", Matrix4::from_translation(vec3(1.0, 0.0, 0.0)));
    let c = Node::new("c", Matrix4::from_translation(vec3(0.0, 2.0, 0.0)));
    a.children.push(1);
    b.children.push(2);
    let mut scene = Scene {
        nodes: vec![a, b, c],
        bones: vec![],
        materials: vec![],
        textures: vec![],
    };
    scene.compute_world_transforms();
    assert_eq!(scene.nodes[2].world, Matrix4::from_translation(vec3(1.0, 2.0, 0.0)));
}

#[test]
fn test_material_flags() {
    let mut mat = Material::new("m");
    assert!(!mat.flags.has(MapKind::Glow));
    mat.set_map(MapKind::Glow, "glow.dds");
    assert!(mat.flags.has(MapKind::Glow));
    assert!(!mat.flags.has(MapKind::Diffuse));
    assert_eq!(mat.map(MapKind::Glow), Some("glow.dds"));
    assert_eq!(MapKind::from_name("night"), Some(MapKind::Night));
}

//! Lookup tables computed once per run: which node a bone points at, which
//! bone (if any) points at a node, each node's parent, and the output number
//! of every mesh.

use errors::Result;
use scene::{BoneIdx, Mesh, NodeIdx, Scene};
use std::collections::HashMap;

pub struct SceneIndex<'a> {
    bone_nodes: Vec<NodeIdx>,
    node_bones: Vec<Option<BoneIdx>>,
    parents: Vec<Option<NodeIdx>>,
    /// All meshes in output order: flat node order, then attachment order.
    pub meshes: Vec<MeshEntry<'a>>,
    /// (node, attachment) -> position in `meshes`.
    mesh_ids: HashMap<(NodeIdx, usize), usize>,
}

pub struct MeshEntry<'a> {
    pub mesh: &'a Mesh,
    /// The node the mesh is attached to.
    pub owner: NodeIdx,
}

impl<'a> SceneIndex<'a> {
    pub fn build(scene: &'a Scene) -> Result<SceneIndex<'a>> {
        let num_nodes = scene.nodes.len();
        check!(num_nodes != 0, "scene has no root node")?;

        let mut parents = vec![None; num_nodes];
        for (idx, node) in scene.nodes.iter().enumerate() {
            for &child in &node.children {
                check!(child < num_nodes,
                    "node {} has child {}, which does not exist", node.name, child)?;
                check!(parents[child].is_none() && child != 0,
                    "node {} appears more than once in the hierarchy", scene.nodes[child].name)?;
                parents[child] = Some(idx);
            }
        }

        let mut node_bones = vec![None; num_nodes];
        let mut bone_nodes = Vec::with_capacity(scene.bones.len());
        for (bone_idx, bone) in scene.bones.iter().enumerate() {
            check!(bone.node < num_nodes,
                "bone {} references node {}, which does not exist", bone_idx, bone.node)?;
            check!(node_bones[bone.node].is_none(),
                "node {} is referenced by more than one bone", scene.nodes[bone.node].name)?;
            node_bones[bone.node] = Some(bone_idx);
            bone_nodes.push(bone.node);
        }

        let mut meshes = vec![];
        let mut mesh_ids = HashMap::new();
        for (node_idx, node) in scene.nodes.iter().enumerate() {
            for (attachment, mesh) in node.meshes() {
                mesh_ids.insert((node_idx, attachment), meshes.len());
                meshes.push(MeshEntry { mesh, owner: node_idx });
            }
        }

        debug!("indexed {} nodes, {} bones, {} meshes",
            num_nodes, bone_nodes.len(), meshes.len());

        Ok(SceneIndex { bone_nodes, node_bones, parents, meshes, mesh_ids })
    }

    pub fn is_joint(&self, node: NodeIdx) -> bool {
        self.node_bones[node].is_some()
    }

    pub fn parent(&self, node: NodeIdx) -> Option<NodeIdx> {
        self.parents[node]
    }

    /// The bone -> node table.
    pub fn bone_nodes(&self) -> &[NodeIdx] {
        &self.bone_nodes
    }

    /// The output number of the mesh in the given attachment slot.
    pub fn mesh_id(&self, node: NodeIdx, attachment: usize) -> Option<usize> {
        self.mesh_ids.get(&(node, attachment)).cloned()
    }
}

#[test]
fn test_index() {
    use scene::fixtures;

    let scene = fixtures::skinned_arm();
    let index = SceneIndex::build(&scene).unwrap();

    assert!(!index.is_joint(0));
    assert!(index.is_joint(2));
    assert!(index.is_joint(3));
    assert_eq!(index.parent(3), Some(2));
    assert_eq!(index.parent(0), None);
    assert_eq!(index.bone_nodes(), &[2, 3]);
    assert_eq!(index.meshes.len(), 1);
    assert_eq!(index.meshes[0].owner, 4);
    assert_eq!(index.mesh_id(4, 0), Some(0));
    assert_eq!(index.mesh_id(2, 0), None);
}

#[test]
fn test_index_rejects_shared_bone_node() {
    use scene::{fixtures, Bone};

    let mut scene = fixtures::skinned_arm();
    scene.bones.push(Bone { node: 2 });
    assert!(SceneIndex::build(&scene).is_err());
}

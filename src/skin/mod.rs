//! Restructure per-vertex bone weights into the form a COLLADA `<skin>`
//! wants.
//!
//! The scene stores skinning per vertex: each vertex has up to four
//! (bone, weight) slots. A `<skin>` instead wants
//!
//! * a list of joints,
//! * a flat list of weights,
//! * for each vertex, the number of influences on it (`<vcount>`), and
//! * for each influence, a (joint index, weight index) pair (`<v>`).
//!
//! We get there by first grouping the weights by joint (the joint-weight
//! table), then laying the groups back out per vertex. The weight list is
//! the concatenation of the groups in joint order, and influences on a vertex
//! are ordered by joint, not by their original slot. Some importers are
//! known to rely on this exact layout, so it has to stay as it is.

pub mod bind_pose;

use errors::{ErrorKind, Result};
use scene::{NodeIdx, VertexWeight};
use std::collections::HashMap;

/// The contents of a `<skin>`'s joint/weight sources and `<vertex_weights>`.
#[derive(Debug, PartialEq)]
pub struct SkinWeights {
    /// Joint nodes, in order of first appearance.
    pub joints: Vec<NodeIdx>,
    /// All the weights, grouped by joint.
    pub weights: Vec<f32>,
    /// Number of influences on each vertex.
    pub vcount: Vec<usize>,
    /// Interleaved (joint index, weight index) pairs, grouped by vertex.
    pub v: Vec<usize>,
}

/// The weights each joint puts on each vertex. Joints are kept in the order
/// they were first seen.
struct JointWeightTable {
    joints: Vec<JointWeights>,
    /// Maps a joint node to its position in `joints`.
    position: HashMap<NodeIdx, usize>,
}

struct JointWeights {
    node: NodeIdx,
    /// (vertex, weight), in vertex order.
    weights: Vec<(usize, f32)>,
}

impl JointWeightTable {
    fn build(
        mesh_name: &str,
        vertex_weights: &[VertexWeight],
        bone_nodes: &[NodeIdx],
    ) -> Result<JointWeightTable> {
        let mut table = JointWeightTable { joints: vec![], position: HashMap::new() };
        for (vertex, vw) in vertex_weights.iter().enumerate() {
            for influence in &vw.slots {
                if influence.weight == 0.0 {
                    continue;
                }
                let node = match bone_nodes.get(influence.bone) {
                    Some(&node) => node,
                    None => bail!(ErrorKind::BoneOutOfRange(mesh_name.to_string(), influence.bone)),
                };
                table.push(node, vertex, influence.weight);
            }
        }
        Ok(table)
    }

    fn push(&mut self, node: NodeIdx, vertex: usize, weight: f32) {
        let joints = &mut self.joints;
        let pos = *self.position.entry(node).or_insert_with(|| {
            joints.push(JointWeights { node, weights: vec![] });
            joints.len() - 1
        });
        joints[pos].weights.push((vertex, weight));
    }
}

impl SkinWeights {
    /// Remap the weights of a mesh. `bone_nodes` maps bone indices to the
    /// joint node they move. `mesh_name` is only used in errors.
    pub fn build(
        mesh_name: &str,
        vertex_weights: &[VertexWeight],
        bone_nodes: &[NodeIdx],
    ) -> Result<SkinWeights> {
        let table = JointWeightTable::build(mesh_name, vertex_weights, bone_nodes)?;
        let num_verts = vertex_weights.len();

        let mut vcount = vec![0; num_verts];
        for joint in &table.joints {
            for &(vertex, _) in &joint.weights {
                vcount[vertex] += 1;
            }
        }

        // Where each vertex's run of influences starts.
        let mut starts = Vec::with_capacity(num_verts);
        let mut num_influences = 0;
        for &count in &vcount {
            starts.push(num_influences);
            num_influences += count;
        }

        // Walk the table in joint order. The weight index is global across
        // joints, and each pair lands in the first free slot of its vertex.
        let mut slots: Vec<Option<(usize, usize)>> = vec![None; num_influences];
        let mut weights = Vec::with_capacity(num_influences);
        for (joint_idx, joint) in table.joints.iter().enumerate() {
            for &(vertex, weight) in &joint.weights {
                let run = &mut slots[starts[vertex]..starts[vertex] + vcount[vertex]];
                if let Some(slot) = run.iter_mut().find(|slot| slot.is_none()) {
                    *slot = Some((joint_idx, weights.len()));
                }
                weights.push(weight);
            }
        }

        let mut v = Vec::with_capacity(2 * num_influences);
        for slot in slots {
            if let Some((joint_idx, weight_idx)) = slot {
                v.push(joint_idx);
                v.push(weight_idx);
            }
        }
        debug_assert_eq!(v.len(), 2 * num_influences);

        let joints = table.joints.iter().map(|joint| joint.node).collect();

        Ok(SkinWeights { joints, weights, vcount, v })
    }
}

#[cfg(test)]
fn w(slots: &[(usize, f32)]) -> VertexWeight {
    ::scene::fixtures::weight(slots)
}

#[test]
fn test_two_vertex_example() {
    // vertex 0: half A, half B; vertex 1: all B
    let bone_nodes = [10, 20]; // A = node 10, B = node 20
    let weights = [w(&[(0, 0.5), (1, 0.5)]), w(&[(1, 1.0)])];
    let skin = SkinWeights::build("mesh", &weights, &bone_nodes).unwrap();
    assert_eq!(skin, SkinWeights {
        joints: vec![10, 20],
        weights: vec![0.5, 0.5, 1.0],
        vcount: vec![2, 1],
        v: vec![0, 0, 1, 1, 1, 2],
    });
}

#[test]
fn test_influences_ordered_by_joint_not_slot() {
    // Vertex 1 lists B before A, but A was seen first (on vertex 0), so A's
    // pair still comes first for vertex 1.
    let bone_nodes = [7, 8];
    let weights = [
        w(&[(0, 1.0)]),
        w(&[(1, 0.75), (0, 0.25)]),
    ];
    let skin = SkinWeights::build("mesh", &weights, &bone_nodes).unwrap();
    assert_eq!(skin.joints, vec![7, 8]);
    // A's group: v0 1.0, v1 0.25; B's group: v1 0.75
    assert_eq!(skin.weights, vec![1.0, 0.25, 0.75]);
    assert_eq!(skin.vcount, vec![1, 2]);
    assert_eq!(skin.v, vec![0, 0, 0, 1, 1, 2]);
}

#[test]
fn test_zero_slots_and_shared_joints() {
    // Two bones can't point at the same node, but zero weights must be
    // skipped without touching the joint list.
    let bone_nodes = [3, 4, 5];
    let weights = [
        w(&[(2, 0.0), (1, 1.0), (0, 0.0), (0, 0.0)]),
        w(&[(1, 0.6), (2, 0.4), (0, 0.0), (0, 0.0)]),
        w(&[(0, 0.0), (0, 0.0), (0, 0.0), (0, 0.0)]),
    ];
    let skin = SkinWeights::build("mesh", &weights, &bone_nodes).unwrap();
    assert_eq!(skin.joints, vec![4, 5]);
    assert_eq!(skin.vcount, vec![1, 2, 0]);
    assert_eq!(skin.weights, vec![1.0, 0.6, 0.4]);
    assert_eq!(skin.v, vec![0, 0, 0, 1, 1, 2]);
}

#[test]
fn test_counts_are_consistent() {
    let bone_nodes = [0, 1, 2, 3];
    let weights = (0..20)
        .map(|i| {
            let a = i % 4;
            let b = (i + 1) % 4;
            let c = (i * 3 + 2) % 4;
            if b == c || a == c {
                w(&[(a, 0.5), (b, 0.5)])
            } else {
                w(&[(a, 0.5), (b, 0.25), (c, 0.25)])
            }
        })
        .collect::<Vec<_>>();
    let skin = SkinWeights::build("mesh", &weights, &bone_nodes).unwrap();

    let total: usize = skin.vcount.iter().sum();
    assert_eq!(total, skin.v.len() / 2);
    assert_eq!(total, skin.weights.len());
    for pair in skin.v.chunks(2) {
        assert!(pair[0] < skin.joints.len());
        assert!(pair[1] < skin.weights.len());
    }

    // Every weight index is used exactly once.
    let mut used = skin.v.chunks(2).map(|pair| pair[1]).collect::<Vec<_>>();
    used.sort();
    assert_eq!(used, (0..skin.weights.len()).collect::<Vec<_>>());

    // No joint repeats.
    let mut joints = skin.joints.clone();
    joints.sort();
    joints.dedup();
    assert_eq!(joints.len(), skin.joints.len());
}

#[test]
fn test_bad_bone_index() {
    let weights = [w(&[(5, 1.0)])];
    let err = SkinWeights::build("meshId3", &weights, &[0, 1]).unwrap_err();
    match *err.kind() {
        ErrorKind::BoneOutOfRange(ref mesh, bone) => {
            assert_eq!(mesh, "meshId3");
            assert_eq!(bone, 5);
        }
        _ => panic!("unexpected error: {}", err),
    }
}

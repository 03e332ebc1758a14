use cgmath::{Matrix4, SquareMatrix};

use crate::attribute::AttributeData;
use crate::common::Aabb;
use crate::geometry::Geometry;
use crate::node::{IntersectMask, NodeId};
use crate::Scene;

/// A query that can pick objects by traversing the scene tree.
///
/// Implement this trait to create custom picking behaviors. The generic
/// traversal handles tree walking, intersection masks, grouping attributes,
/// AABB culling, and coordinate space transformations - implementors only
/// need to define the actual tests.
pub trait PickQuery: Sized {
    /// Result type returned for hits. A single geometry test may produce multiple
    /// results (e.g., ray hitting multiple triangles).
    type Result;

    /// Subtrees whose effective mask shares no bit with this one are skipped.
    fn mask(&self) -> IntersectMask;

    /// Broad phase test: does this query potentially intersect geometry within the bounds?
    ///
    /// Return `true` if the subtree should be explored, `false` to skip it entirely.
    /// This should be a fast, conservative test - false positives are acceptable,
    /// but false negatives will cause missed results.
    fn might_intersect_bounds(&self, bounds: &Aabb) -> bool;

    /// Transform this query to a different coordinate space.
    ///
    /// Used to transform the query from world space to local geometry space.
    fn transform(&self, matrix: &Matrix4<f32>) -> Self;

    /// Narrow phase test: test the query against a geometry leaf and collect results.
    ///
    /// The query has already been transformed to local geometry space.
    fn collect_geometry_hits(
        &self,
        geometry: &Geometry,
        node_id: NodeId,
        world_transform: &Matrix4<f32>,
        results: &mut Vec<Self::Result>,
    );
}

/// Picks all geometry in the scene that matches the given query.
///
/// Walks the scene tree from all root nodes, using cached bounding boxes
/// for efficient culling. The query is transformed to local space for each
/// geometry test.
pub fn pick_all<Q: PickQuery>(query: &Q, scene: &Scene) -> Vec<Q::Result> {
    let mut results = Vec::new();

    for &root_id in scene.root_nodes() {
        pick_node(query, root_id, scene, &mut results);
    }

    results
}

/// Recursively tests a query against a node and its descendants.
fn pick_node<Q: PickQuery>(query: &Q, node_id: NodeId, scene: &Scene, results: &mut Vec<Q::Result>) {
    let Some(node) = scene.get_node(node_id) else {
        return;
    };

    // Masks: the node's own, narrowed by any collision attributes
    let mut mask = node.intersect_mask();
    for attached in node.attributes() {
        if let Some(AttributeData::Collision(collision)) =
            scene.attribute(attached.id).map(|attribute| attribute.data())
        {
            if !collision.enabled {
                return;
            }
            mask &= collision.mask;
        }
    }
    if !mask.intersects(query.mask()) {
        return;
    }

    // Broad phase: Test against this node's bounding box
    let Some(bounds) = scene.nodes_bounding(node_id) else {
        return; // Subtree has no geometry, skip
    };
    if !query.might_intersect_bounds(&bounds) {
        return;
    }

    // Narrow phase: If this node carries geometry, test it
    if let Some(geometry) = node.geometry() {
        let Some(world_transform) = scene.global_transform(node_id) else {
            return;
        };
        match world_transform.invert() {
            Some(world_to_local) => {
                let local_query = query.transform(&world_to_local);
                local_query.collect_geometry_hits(geometry, node_id, &world_transform, results);
            }
            None => log::warn!("node {} has a singular world transform; skipped", node_id),
        }
    }

    // Only children the grouping attribute lets through; LOD tests its first child
    for (_, child_id) in scene.select_children(node, None) {
        pick_node(query, child_id, scene, results);
    }
}

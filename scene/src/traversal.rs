//! The render traversal.
//!
//! [`Scene::render_frame`] walks each root depth first. A node's State attributes
//! are applied on the way down and undone on the way up, so siblings never see
//! each other's values. Grouping attributes decide which children are visited.

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix};

use crate::attribute::{AttributeCategory, AttributeData, AttributeId, StateKind};
use crate::backend::{DrawCall, RenderSink};
use crate::graphics_state::{GraphicsState, LockKey, SavedSlot};
use crate::node::{Node, NodeId};
use crate::scene::Scene;

/// Something a node pushed onto the graphics state, undone on exit.
enum Applied {
    State {
        kind: StateKind,
        key: LockKey,
        saved: SavedSlot,
        locked: bool,
    },
    LocalLight(AttributeId),
}

struct FrameTraversal<'a> {
    scene: &'a Scene,
    state: &'a mut GraphicsState,
    sink: &'a mut dyn RenderSink,
    eye: Point3<f32>,
}

impl FrameTraversal<'_> {
    fn visit(&mut self, node_id: NodeId, parent_world: Matrix4<f32>, decal_offset: f32) {
        let scene = self.scene;
        let Some(node) = scene.get_node(node_id) else {
            return;
        };
        let Some(local) = scene.local_transform(node_id) else {
            return;
        };
        let world = parent_world * local;

        let mut applied = Vec::new();
        for attached in node.attributes() {
            let Some(attribute) = scene.attribute(attached.id) else {
                continue;
            };
            match attribute.data() {
                AttributeData::State(value) => {
                    let kind = value.kind();
                    let key = LockKey::from(attached.id);
                    let saved = self.state.save(kind);
                    self.state.set(key, *value);
                    let locked = attribute.is_override() && self.state.lock(kind, key);
                    applied.push(Applied::State {
                        kind,
                        key,
                        saved,
                        locked,
                    });
                }
                AttributeData::Light(light) if light.enabled && light.is_local() => {
                    self.state.add_local_light(attached.id);
                    applied.push(Applied::LocalLight(attached.id));
                }
                data => {
                    if let Some(binding) = data.binding() {
                        binding.update(&world);
                    }
                }
            }
        }

        if node.geometry().is_some() {
            self.sink.draw(&DrawCall {
                node: node_id,
                world_transform: world,
                state: self.state.resolved(),
                decal_offset,
            });
        }

        let lod_distance = self.lod_distance(node_id, &world);
        for (child_offset, child_id) in scene.select_children(node, Some(lod_distance)) {
            self.visit(child_id, world, decal_offset + child_offset);
        }

        for entry in applied.into_iter().rev() {
            match entry {
                Applied::State {
                    kind,
                    key,
                    saved,
                    locked,
                } => {
                    if locked {
                        self.state.unlock(kind, key);
                    }
                    self.state.restore(key, kind, saved);
                }
                Applied::LocalLight(id) => {
                    self.state.remove_local_light(id);
                }
            }
        }
    }

    /// Distance from the eye to the node's subtree, measured to its bounds center.
    fn lod_distance(&self, node_id: NodeId, world: &Matrix4<f32>) -> f32 {
        let center = match self.scene.nodes_bounding(node_id) {
            Some(bounds) => bounds.center(),
            None => Point3::from_vec(world.w.truncate()),
        };
        (center - self.eye).magnitude()
    }
}

impl Scene {
    /// Children to traverse below `node`, each with the decal depth offset it adds.
    ///
    /// A Switch attribute keeps only enabled children, a LOD attribute keeps the one
    /// child matching `lod_distance` (the first child when no distance is given),
    /// and a Decal attribute layers the children in order.
    pub(crate) fn select_children(
        &self,
        node: &Node,
        lod_distance: Option<f32>,
    ) -> Vec<(f32, NodeId)> {
        let children = node.children();
        let grouping = node
            .attributes()
            .iter()
            .filter(|attached| attached.attr_type.category() == AttributeCategory::Grouping)
            .find_map(|attached| self.attribute(attached.id));

        let Some(grouping) = grouping else {
            return children.iter().map(|&child| (0.0, child)).collect();
        };

        match grouping.data() {
            AttributeData::Switch(switch) => children
                .iter()
                .enumerate()
                .filter(|(index, _)| switch.is_enabled(*index))
                .map(|(_, &child)| (0.0, child))
                .collect(),
            AttributeData::Lod(lod) => {
                let index = match lod_distance {
                    Some(distance) => lod.select_child(distance, children.len()),
                    None => (!children.is_empty()).then_some(0),
                };
                index
                    .and_then(|i| children.get(i))
                    .map(|&child| vec![(0.0, child)])
                    .unwrap_or_default()
            }
            AttributeData::Decal(decal) => children
                .iter()
                .enumerate()
                .map(|(index, &child)| (decal.layer_offset(index), child))
                .collect(),
            _ => children.iter().map(|&child| (0.0, child)).collect(),
        }
    }

    /// Draws every root's subtree to the render sink.
    ///
    /// For each root the graphics state is cleared and the root recorded as the
    /// current scene. Nodes are then visited depth-first: State attributes are
    /// applied (and locked if they override), local lights switched on, container
    /// bindings refreshed with the node's world transform, geometry drawn with the
    /// resolved state, and children chosen through the node's grouping attribute.
    /// Everything a node applied is undone in reverse order when it is exited.
    pub fn render_frame(&self, state: &mut GraphicsState, eye: Point3<f32>) {
        let mut sink = self.sink.borrow_mut();
        let mut traversal = FrameTraversal {
            scene: self,
            state,
            sink: &mut **sink,
            eye,
        };

        for &root in self.root_nodes() {
            traversal.state.clear_state();
            traversal.state.set_current_scene(Some(root));
            traversal.visit(root, Matrix4::identity(), 0.0);
        }
    }
}

use glam::{Mat4, Quat, Vec3};
use slotmap::SlotMap;

use crate::animation::clip::Animation;
use crate::animation::manager::AnimationManager;
use crate::animation::tracks::InterpolationMode;
use crate::errors::{Result, SceneError};
use crate::renderer::device::{BufferId, BufferTarget, GraphicsDevice};
use crate::renderer::draw_list::{DrawEntry, DrawList};
use crate::renderer::frame::{FramePhase, FrameStats};
use crate::renderer::geometry_buffers::{self, GeometryBuffers};
use crate::renderer::lighting::{self, FrameLight, LIGHT_BLOCK_BINDING};
use crate::renderer::passes::{self, PassContext};
use crate::renderer::settings::{LightingStrategy, SceneSettings};
use crate::renderer::shader_library::ShaderLibrary;
use crate::resources::{Material, Mesh};
use crate::scene::camera::Camera;
use crate::scene::light::PointLight;
use crate::scene::node::{Node, Renderable};
use crate::scene::transform_system;
use crate::scene::{LightKey, MeshKey, NodeHandle};

/// Scene graph and frame driver.
///
/// The scene owns:
/// - the node tree, rooted at a node created with the scene
/// - the mesh and light registries that nodes reference
/// - the camera, the animation manager and the settings
/// - the packed GPU geometry produced by [`Scene::compile`]
///
/// A frame is `update_animation` followed by `render`. `render` builds and
/// sorts the draw list, gathers lights, then runs the depth, ambient and
/// light passes.
pub struct Scene {
    pub name: String,

    nodes: SlotMap<NodeHandle, Node>,
    root: NodeHandle,

    // ==== Registries ====
    meshes: SlotMap<MeshKey, Mesh>,
    lights: SlotMap<LightKey, PointLight>,

    pub camera: Camera,
    settings: SceneSettings,
    animations: AnimationManager,

    // ==== Per-frame state ====
    draw_list: DrawList,
    frame_lights: Vec<FrameLight>,
    phase: FramePhase,

    // ==== GPU state ====
    geometry: Option<GeometryBuffers>,
    /// Light block buffer and the light capacity it was sized for
    light_buffer: Option<(BufferId, usize)>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_settings(name, SceneSettings::default())
    }

    pub fn with_settings(name: impl Into<String>, settings: SceneSettings) -> Self {
        let name = name.into();
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new("Root"));

        log::debug!("Created scene '{name}' with {settings:?}");

        Self {
            name,
            nodes,
            root,
            meshes: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            camera: Camera::default(),
            animations: AnimationManager::new(settings.tick_rate),
            settings,
            draw_list: DrawList::new(),
            frame_lights: Vec::new(),
            phase: FramePhase::Idle,
            geometry: None,
            light_buffer: None,
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn set_lighting_strategy(&mut self, strategy: LightingStrategy) {
        if self.settings.lighting != strategy {
            log::info!("Scene '{}' lighting strategy: {strategy:?}", self.name);
            self.settings.lighting = strategy;
        }
    }

    /// Sets the radius used for lights without explicit attenuation and
    /// returns the previous one.
    pub fn set_default_light_radius(&mut self, radius: f32) -> f32 {
        let previous = self.settings.default_light_radius;
        self.settings.default_light_radius = radius;
        previous
    }

    /// Interpolation mode for tracks created against this scene.
    #[must_use]
    pub fn interpolation_mode(&self) -> InterpolationMode {
        if self.settings.hermite_interpolation {
            InterpolationMode::Hermite
        } else {
            InterpolationMode::Linear
        }
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Starts building a node.
    pub fn build_node(&mut self, name: &str) -> NodeBuilder<'_> {
        NodeBuilder::new(self, name)
    }

    /// Creates an empty node under `parent`.
    pub fn create_node(&mut self, name: &str, parent: NodeHandle) -> NodeHandle {
        self.add_node(Node::new(name), Some(parent))
    }

    /// Inserts `node` under `parent`, or under the root when `parent` is
    /// `None` or unknown.
    pub fn add_node(&mut self, mut node: Node, parent: Option<NodeHandle>) -> NodeHandle {
        let parent = parent
            .filter(|p| self.nodes.contains_key(*p))
            .unwrap_or(self.root);

        node.parent = Some(parent);
        node.children.clear();
        node.transform.mark_dirty();
        let handle = self.nodes.insert(node);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        handle
    }

    /// Moves `child` (with its subtree) under `parent`.
    ///
    /// The moved subtree is marked dirty. Attaching a node to itself, to one of
    /// its own descendants, or moving the root is refused.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent {
            log::warn!("Cannot attach node to itself!");
            return;
        }
        if child == self.root {
            log::warn!("Cannot reparent the scene root");
            return;
        }
        if !self.nodes.contains_key(child) || !self.nodes.contains_key(parent) {
            log::warn!("Attach with an unknown node ignored");
            return;
        }
        if self.is_ancestor(child, parent) {
            log::warn!("Cannot attach node under its own descendant");
            return;
        }

        // 1. Detach from old parent
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent.and_then(|p| self.nodes.get_mut(p)) {
            if let Some(i) = p.children.iter().position(|&x| x == child) {
                p.children.remove(i);
            }
        }

        // 2. Attach to new parent
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }

        // 3. World position generally changes
        transform_system::mark_subtree_dirty(&mut self.nodes, child);
    }

    /// Removes `handle` and its whole subtree, including the lights attached
    /// to it. Meshes stay registered since other nodes may share them.
    pub fn remove_node(&mut self, handle: NodeHandle) {
        if handle == self.root {
            log::warn!("Cannot remove the scene root");
            return;
        }
        let Some(parent) = self.nodes.get(handle).map(|n| n.parent) else {
            return;
        };

        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p)) {
            if let Some(i) = p.children.iter().position(|&x| x == handle) {
                p.children.remove(i);
            }
        }

        let mut stack = vec![handle];
        let mut removed = 0usize;
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.remove(current) else {
                continue;
            };
            for key in node.lights() {
                self.lights.remove(key);
            }
            stack.extend_from_slice(&node.children);
            removed += 1;
        }

        log::debug!("Removed {removed} node(s) from scene '{}'", self.name);
    }

    /// Whether `ancestor` lies on the parent chain of `node` (or is `node`).
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeHandle, node: NodeHandle) -> bool {
        let mut current = Some(node);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.nodes.get(h).and_then(|n| n.parent);
        }
        false
    }

    #[inline]
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    /// Mutable node access. The transform is not reachable from here; use
    /// [`Scene::set_local_transform`].
    #[inline]
    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &SlotMap<NodeHandle, Node> {
        &self.nodes
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// First node named `name`, depth-first from the root.
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<NodeHandle> {
        let mut found = None;
        self.walk_until(|handle, node| {
            if node.name == name {
                found = Some(handle);
                false
            } else {
                true
            }
        });
        found
    }

    /// Visits every node depth-first from the root, parents before children.
    pub fn walk(&self, mut visit: impl FnMut(NodeHandle, &Node)) {
        self.walk_until(|handle, node| {
            visit(handle, node);
            true
        });
    }

    fn walk_until(&self, mut visit: impl FnMut(NodeHandle, &Node) -> bool) {
        let mut stack = vec![self.root];
        while let Some(handle) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            if !visit(handle, node) {
                return;
            }
            stack.extend(node.children.iter().rev().copied());
        }
    }

    // ========================================================================
    // Transforms & visibility
    // ========================================================================

    /// Updates the given local components and marks the node and its subtree
    /// dirty. `None` components are left unchanged.
    pub fn set_local_transform(
        &mut self,
        handle: NodeHandle,
        translation: Option<Vec3>,
        rotation: Option<Quat>,
        scale: Option<Vec3>,
    ) {
        let Some(node) = self.nodes.get_mut(handle) else {
            return;
        };
        if let Some(t) = translation {
            node.transform.set_position(t);
        }
        if let Some(r) = rotation {
            node.transform.set_rotation(r);
        }
        if let Some(s) = scale {
            node.transform.set_scale(s);
        }
        transform_system::mark_subtree_dirty(&mut self.nodes, handle);
    }

    /// Recomputes one node's matrices from its parent's cached world matrix if
    /// it is dirty. Returns `true` if anything was recomputed.
    pub fn update_world_transform(&mut self, handle: NodeHandle) -> bool {
        transform_system::update_node(&mut self.nodes, handle)
    }

    /// Updates every node top-down. Returns the number of nodes recomputed.
    pub fn update_hierarchy(&mut self) -> usize {
        transform_system::update_hierarchy(&mut self.nodes, self.root)
    }

    /// World-space position of a node, from its cached world matrix.
    #[must_use]
    pub fn world_position(&self, handle: NodeHandle) -> Option<Vec3> {
        self.nodes.get(handle).map(|n| n.transform.world_position())
    }

    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.visible = visible;
        }
    }

    // ========================================================================
    // Meshes
    // ========================================================================

    /// Registers a mesh. It is drawn once attached to a node and packed by the
    /// next [`Scene::compile`].
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshKey {
        self.meshes.insert(mesh)
    }

    /// Registers a copy of `source`'s geometry under a new name and material.
    pub fn duplicate_mesh(
        &mut self,
        source: MeshKey,
        name: &str,
        material: Material,
    ) -> Option<MeshKey> {
        let copy = self.meshes.get(source)?.duplicate(name, material);
        Some(self.meshes.insert(copy))
    }

    /// Attaches a registered mesh to a node.
    pub fn attach_mesh(&mut self, node: NodeHandle, mesh: MeshKey) {
        if !self.meshes.contains_key(mesh) {
            log::warn!("Attach of an unknown mesh ignored");
            return;
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.renderables.push(Renderable::Mesh(mesh));
        }
    }

    #[inline]
    #[must_use]
    pub fn mesh(&self, key: MeshKey) -> Option<&Mesh> {
        self.meshes.get(key)
    }

    #[inline]
    pub fn mesh_mut(&mut self, key: MeshKey) -> Option<&mut Mesh> {
        self.meshes.get_mut(key)
    }

    /// First registered mesh named `name`.
    #[must_use]
    pub fn mesh_by_name(&self, name: &str) -> Option<(MeshKey, &Mesh)> {
        self.meshes.iter().find(|(_, m)| m.name == name)
    }

    #[inline]
    #[must_use]
    pub fn meshes(&self) -> &SlotMap<MeshKey, Mesh> {
        &self.meshes
    }

    // ========================================================================
    // Lights
    // ========================================================================

    /// Registers a point light and attaches it to `node`.
    pub fn add_point_light(&mut self, node: NodeHandle, light: PointLight) -> Option<LightKey> {
        if !self.nodes.contains_key(node) {
            log::warn!("Point light '{}' added to an unknown node", light.name);
            return None;
        }
        let key = self.lights.insert(light);
        if let Some(n) = self.nodes.get_mut(node) {
            n.renderables.push(Renderable::Light(key));
        }
        Some(key)
    }

    #[inline]
    #[must_use]
    pub fn light(&self, key: LightKey) -> Option<&PointLight> {
        self.lights.get(key)
    }

    #[inline]
    pub fn light_mut(&mut self, key: LightKey) -> Option<&mut PointLight> {
        self.lights.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Finds the lights of every visible node, updating transforms on the way.
    pub fn gather_lights(&mut self) -> &[FrameLight] {
        lighting::gather_lights(
            &mut self.nodes,
            &self.lights,
            self.root,
            self.settings.default_light_radius,
            &mut self.frame_lights,
        );
        &self.frame_lights
    }

    /// Lights gathered for the last frame.
    #[inline]
    #[must_use]
    pub fn frame_lights(&self) -> &[FrameLight] {
        &self.frame_lights
    }

    // ========================================================================
    // Animation
    // ========================================================================

    pub fn add_animation(&mut self, animation: Animation) {
        self.animations.add_animation(animation);
    }

    #[inline]
    #[must_use]
    pub fn animations(&self) -> &AnimationManager {
        &self.animations
    }

    /// Samples every animation onto its nodes and advances the clock by `dt`
    /// seconds.
    pub fn update_animation(&mut self, dt: f32) {
        self.animations.update_state(dt, &mut self.nodes);
    }

    // ========================================================================
    // GPU geometry
    // ========================================================================

    /// Packs every registered mesh into one shared vertex/index buffer pair,
    /// replacing any previous packing.
    pub fn compile(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if let Some(previous) = self.geometry.take() {
            previous.release(device);
        }
        let geometry = GeometryBuffers::build(device, &self.meshes)?;
        log::info!(
            "Compiled scene '{}': {} mesh(es), {} node(s)",
            self.name,
            self.meshes.len(),
            self.nodes.len()
        );
        self.geometry = Some(geometry);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.geometry.is_some()
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> Option<&GeometryBuffers> {
        self.geometry.as_ref()
    }

    /// Frees every GPU buffer the scene owns.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(geometry) = self.geometry.take() {
            geometry.release(device);
        }
        if let Some((buffer, _)) = self.light_buffer.take() {
            device.destroy_buffer(buffer);
        }
    }

    // ========================================================================
    // Draw list
    // ========================================================================

    /// Rebuilds the draw list from the tree.
    ///
    /// Depth-first from the root; an invisible node hides its entire subtree.
    /// Each visited node's world transform is brought up to date before its
    /// children are visited, and a node's meshes are appended after its
    /// children's.
    pub fn build_draw_list(&mut self) -> &DrawList {
        self.draw_list.clear();
        let view_projection = *self.camera.view_projection_matrix();

        // (node, children already pushed, parent recomputed)
        let mut stack: Vec<(NodeHandle, bool, bool)> = vec![(self.root, false, false)];
        while let Some((handle, expanded, parent_changed)) = stack.pop() {
            if expanded {
                let Some(node) = self.nodes.get(handle) else {
                    continue;
                };
                let model = Mat4::from(node.transform.world_matrix);
                for key in node.meshes() {
                    let Some(mesh) = self.meshes.get(key) else {
                        log::trace!("Node '{}' references a removed mesh", node.name);
                        continue;
                    };
                    self.draw_list.push(DrawEntry::new(
                        handle,
                        key,
                        mesh.material.kind,
                        model,
                        &view_projection,
                    ));
                }
                continue;
            }

            let visible = self.nodes.get(handle).is_some_and(|n| n.visible);
            if !visible {
                continue;
            }

            if parent_changed {
                if let Some(node) = self.nodes.get_mut(handle) {
                    node.transform.mark_dirty();
                }
            }
            let changed = transform_system::update_node(&mut self.nodes, handle);

            stack.push((handle, true, false));
            if let Some(node) = self.nodes.get(handle) {
                for &child in node.children.iter().rev() {
                    stack.push((child, false, changed));
                }
            }
        }

        log::trace!("Built draw list with {} entries", self.draw_list.len());
        &self.draw_list
    }

    /// Stable sort of the draw list by material type.
    pub fn sort_draw_list(&mut self) {
        self.draw_list.sort_by_material();
    }

    #[inline]
    #[must_use]
    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Renders one frame.
    ///
    /// Fails without issuing draw commands if a material has no program, or if
    /// there is geometry to draw but the scene was not compiled (or meshes were
    /// added since).
    pub fn render(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shaders: &ShaderLibrary,
    ) -> Result<FrameStats> {
        let result = self.render_frame(device, shaders);
        self.phase = FramePhase::Idle;
        result
    }

    fn render_frame(
        &mut self,
        device: &mut dyn GraphicsDevice,
        shaders: &ShaderLibrary,
    ) -> Result<FrameStats> {
        let mut stats = FrameStats::default();

        self.phase = FramePhase::BuildDrawList;
        stats.enter(self.phase);
        self.build_draw_list();

        self.phase = FramePhase::SortDrawList;
        stats.enter(self.phase);
        self.sort_draw_list();

        self.gather_lights();
        stats.entries = self.draw_list.len();

        if self.draw_list.is_empty() {
            log::trace!("Scene '{}' has nothing to draw", self.name);
            stats.enter(FramePhase::Idle);
            return Ok(stats);
        }

        let Some(geometry) = self.geometry.as_ref() else {
            log::error!("Scene '{}' rendered before compile", self.name);
            return Err(SceneError::NotCompiled(self.name.clone()));
        };
        passes::validate(&self.draw_list, shaders, geometry, &self.name)?;

        let light_block = match self.settings.lighting {
            LightingStrategy::PerLightForward => None,
            LightingStrategy::LightBuffer { capacity } => Some(upload_light_block(
                device,
                &mut self.light_buffer,
                &self.frame_lights,
                capacity,
            )?),
        };

        let mut ctx = PassContext {
            device,
            shaders,
            meshes: &self.meshes,
            geometry,
            view_position: self.camera.eye(),
            stats: &mut stats,
        };

        self.phase = FramePhase::DepthPrePass;
        passes::depth_prepass(&mut ctx, &self.draw_list)?;

        self.phase = FramePhase::AmbientPass;
        passes::ambient_pass(&mut ctx, &self.draw_list, light_block.is_some())?;

        self.phase = FramePhase::LightPass;
        match light_block {
            None => {
                for light in &self.frame_lights {
                    passes::forward_light_pass(&mut ctx, &self.draw_list, light)?;
                }
                ctx.stats.lights = self.frame_lights.len();
            }
            Some((buffer, count)) => {
                ctx.device.bind_buffer_base(LIGHT_BLOCK_BINDING, buffer);
                passes::light_buffer_pass(&mut ctx, &self.draw_list, count)?;
                ctx.stats.lights = count;
            }
        }

        stats.enter(FramePhase::Idle);
        log::debug!(
            "Frame '{}': {} entries, {} lights, {} draws, {} program binds, {} passes",
            self.name,
            stats.entries,
            stats.lights,
            stats.draw_calls,
            stats.program_binds,
            stats.passes
        );
        Ok(stats)
    }
}

/// Makes sure the light block buffer fits `capacity` lights and uploads the
/// gathered lights. Returns the buffer and the number of lights packed.
fn upload_light_block(
    device: &mut dyn GraphicsDevice,
    slot: &mut Option<(BufferId, usize)>,
    lights: &[FrameLight],
    capacity: usize,
) -> Result<(BufferId, usize)> {
    let required = lighting::check_capacity(capacity)?;

    let buffer = match *slot {
        Some((buffer, cap)) if cap == capacity => buffer,
        previous => {
            if let Some((old, _)) = previous {
                device.destroy_buffer(old);
            }
            *slot = None;

            let buffer = device.create_buffer(BufferTarget::Uniform, required);
            let allocated = device.buffer_capacity(buffer);
            if allocated < required {
                device.destroy_buffer(buffer);
                log::error!("Light block allocation failed: required {required} bytes, got {allocated}");
                return Err(SceneError::BufferAllocation {
                    target: BufferTarget::Uniform,
                    required,
                    allocated,
                });
            }
            log::debug!("Allocated light block for {capacity} light(s)");
            *slot = Some((buffer, capacity));
            buffer
        }
    };

    let (bytes, count) = lighting::pack_light_block(lights, capacity);
    geometry_buffers::write_checked(device, buffer, 0, &bytes)?;
    Ok((buffer, count))
}

// ============================================================================
// NodeBuilder
// ============================================================================

/// Chained node construction.
///
/// ```rust,ignore
/// let cube = scene
///     .build_node("Cube")
///     .with_position(1.0, 0.0, 0.0)
///     .with_mesh(mesh)
///     .build();
/// ```
pub struct NodeBuilder<'a> {
    scene: &'a mut Scene,
    node: Node,
    parent: Option<NodeHandle>,
    lights: Vec<PointLight>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(scene: &'a mut Scene, name: &str) -> Self {
        Self {
            scene,
            node: Node::new(name),
            parent: None,
            lights: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.node.transform.set_position(Vec3::new(x, y, z));
        self
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.node.transform.set_rotation(rotation);
        self
    }

    #[must_use]
    pub fn with_scale(mut self, s: f32) -> Self {
        self.node.transform.set_scale(Vec3::splat(s));
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: MeshKey) -> Self {
        self.node.renderables.push(Renderable::Mesh(mesh));
        self
    }

    #[must_use]
    pub fn with_light(mut self, light: PointLight) -> Self {
        self.lights.push(light);
        self
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.node.visible = visible;
        self
    }

    /// Inserts the node and returns its handle.
    pub fn build(self) -> NodeHandle {
        let handle = self.scene.add_node(self.node, self.parent);
        for light in self.lights {
            self.scene.add_point_light(handle, light);
        }
        handle
    }
}

use glam::Affine3A;
use smallvec::SmallVec;

use crate::scene::transform::Transform;
use crate::scene::{LightKey, MeshKey, NodeHandle};

/// Something a node can carry into the frame: geometry or a light.
///
/// Attachments are non-owning. The mesh and light data live in the scene's
/// registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Renderable {
    Mesh(MeshKey),
    Light(LightKey),
}

/// Tag for [`Renderable`] dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderableKind {
    Mesh,
    Light,
}

impl Renderable {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RenderableKind {
        match self {
            Renderable::Mesh(_) => RenderableKind::Mesh,
            Renderable::Light(_) => RenderableKind::Light,
        }
    }
}

/// A scene node.
///
/// # Hierarchy
///
/// Nodes form a tree through parent-child links:
/// - `parent`: handle to the parent node (`None` for the root and for detached nodes)
/// - `children`: ordered child handles; a node owns its subtree
///
/// # Transform
///
/// Each node has a [`Transform`] holding local TRS, the cached local and world
/// matrices, and the dirty flag. It is read-only from outside the crate; local
/// edits go through [`Scene::set_local_transform`](crate::scene::Scene::set_local_transform)
/// so the whole subtree is marked dirty.
///
/// # Attachments
///
/// `renderables` lists the meshes and lights drawn at this node's world
/// transform. Most nodes carry zero to two, so they are stored inline.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,

    // === Core Hierarchy ===
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,

    // === Core Spatial Data ===
    pub(crate) transform: Transform,

    // === Core State ===
    /// Hides this node and every descendant from rendering and light discovery
    pub visible: bool,
    /// Set once an animation track has written to this node
    pub(crate) animated: bool,

    pub(crate) renderables: SmallVec<[Renderable; 2]>,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            visible: true,
            animated: false,
            renderables: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn renderables(&self) -> &[Renderable] {
        &self.renderables
    }

    /// Attached mesh keys, in attachment order.
    pub fn meshes(&self) -> impl Iterator<Item = MeshKey> + '_ {
        self.renderables.iter().filter_map(|r| match r {
            Renderable::Mesh(key) => Some(*key),
            Renderable::Light(_) => None,
        })
    }

    /// Attached light keys, in attachment order.
    pub fn lights(&self) -> impl Iterator<Item = LightKey> + '_ {
        self.renderables.iter().filter_map(|r| match r {
            Renderable::Light(key) => Some(*key),
            Renderable::Mesh(_) => None,
        })
    }

    /// Whether an animation track has driven this node.
    #[inline]
    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.animated
    }

    #[inline]
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.transform.world_matrix
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new("Node")
    }
}

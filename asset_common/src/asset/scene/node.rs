use std::fmt;

use serde::{Deserialize, Serialize};
use ultraviolet::Mat4;

/// Identity of the mesh data behind a node.
/// Several nodes can instance the same geometry.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct GeometryKey(String);
impl GeometryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeometryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryRef {
    pub key: GeometryKey,
    /// File stem of the exported geometry.
    pub name: String,
}

impl GeometryRef {
    pub fn new(key: GeometryKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
        }
    }

    /// Geometry whose key doubles as its name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: GeometryKey::new(name.clone()),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum NodeKind {
    Mesh {
        geometry: GeometryRef,
        /// Name of a material in the same scene.
        material: Option<String>,
    },
    Empty,
}

impl NodeKind {
    pub fn geometry(&self) -> Option<&GeometryRef> {
        match self {
            NodeKind::Mesh { geometry, .. } => Some(geometry),
            NodeKind::Empty => None,
        }
    }

    pub fn material(&self) -> Option<&str> {
        match self {
            NodeKind::Mesh { material, .. } => material.as_deref(),
            NodeKind::Empty => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct NodeFlags {
    pub visible: bool,
    pub solid: bool,
    pub cast_shadow: bool,
    pub use_motion_blur: bool,
    pub layer: i32,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            visible: true,
            solid: false,
            cast_shadow: true,
            use_motion_blur: true,
            layer: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    /// Relative to the parent, host coordinate space.
    pub local_transform: Mat4,
    /// Host coordinate space.
    pub world_transform: Mat4,
    /// Name of the parent node. Only ever used as a textual reference.
    pub parent: Option<String>,
    pub flags: NodeFlags,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            local_transform: Mat4::identity(),
            world_transform: Mat4::identity(),
            parent: None,
            flags: NodeFlags::default(),
        }
    }

    pub fn mesh(name: impl Into<String>, geometry: GeometryRef) -> Self {
        Self::new(
            name,
            NodeKind::Mesh {
                geometry,
                material: None,
            },
        )
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Empty)
    }

    /// Sets both transforms, for nodes without a parent.
    pub fn with_root_transform(mut self, transform: Mat4) -> Self {
        self.local_transform = transform;
        self.world_transform = transform;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>, parent_world: Mat4) -> Self {
        self.parent = Some(parent.into());
        self.world_transform = parent_world * self.local_transform;
        self
    }

    pub fn with_material(mut self, material_name: impl Into<String>) -> Self {
        if let NodeKind::Mesh { material, .. } = &mut self.kind {
            *material = Some(material_name.into());
        }
        self
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh { .. })
    }
}

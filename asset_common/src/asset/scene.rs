mod material;
mod node;
mod texture;

pub use material::*;
pub use node::*;
pub use texture::*;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::transform::{AxisConversion, UpAxis};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("two {kind}s are named {name:?}")]
    DuplicateName { kind: &'static str, name: String },
    #[error("{kind} name {name:?} can't be used as a file name")]
    InvalidName { kind: &'static str, name: String },
}

/// A read-only picture of the host scene, taken once per export.
/// Nodes live in an arena, parents are looked up by name.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub nodes: Vec<SceneNode>,
    pub materials: Vec<Material>,
    pub images: ImageTable,
    pub up_axis: UpAxis,
    /// Relative texture paths are resolved against this.
    pub base_dir: PathBuf,
}

impl SceneSnapshot {
    pub fn new(up_axis: UpAxis, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            up_axis,
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    pub fn axis_conversion(&self) -> AxisConversion {
        AxisConversion::from_up_axis(self.up_axis)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|material| material.name == name)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Node, material and geometry names become file names and archive paths,
    /// so they have to be unique and free of separators and quotes.
    pub fn validate(&self) -> Result<(), SceneError> {
        check_names("node", self.nodes.iter().map(|node| node.name.as_str()))?;
        check_names(
            "material",
            self.materials.iter().map(|material| material.name.as_str()),
        )?;

        // Different geometry may not share a file name.
        let mut geometry_names = std::collections::HashMap::new();
        for geometry in self.nodes.iter().filter_map(|node| node.kind.geometry()) {
            check_file_name("geometry", &geometry.name)?;
            let key = geometry_names
                .entry(geometry.name.as_str())
                .or_insert(&geometry.key);
            if *key != &geometry.key {
                return Err(SceneError::DuplicateName {
                    kind: "geometry",
                    name: geometry.name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn check_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), SceneError> {
    let mut seen = HashSet::new();
    for name in names {
        check_file_name(kind, name)?;
        if !seen.insert(name) {
            return Err(SceneError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_file_name(kind: &'static str, name: &str) -> Result<(), SceneError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '"', '\0']);
    if invalid {
        return Err(SceneError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_node_names_are_rejected() {
        let mut scene = SceneSnapshot::default();
        scene.nodes.push(SceneNode::empty("Lamp"));
        scene.nodes.push(SceneNode::mesh("Lamp", GeometryRef::named("Bulb")));

        assert_eq!(
            scene.validate(),
            Err(SceneError::DuplicateName {
                kind: "node",
                name: "Lamp".into()
            })
        );
    }

    #[test]
    fn a_node_and_a_material_may_share_a_name() {
        let mut scene = SceneSnapshot::default();
        scene.nodes.push(SceneNode::mesh("Wood", GeometryRef::named("Plank")));
        scene.materials.push(Material::new("Wood"));
        assert_eq!(scene.validate(), Ok(()));
    }

    #[test]
    fn shared_geometry_is_not_a_duplicate() {
        let mut scene = SceneSnapshot::default();
        scene.nodes.push(SceneNode::mesh("A", GeometryRef::named("Data")));
        scene.nodes.push(SceneNode::mesh("B", GeometryRef::named("Data")));
        assert_eq!(scene.validate(), Ok(()));
    }

    #[test]
    fn distinct_geometry_with_the_same_file_name_is_rejected() {
        let mut scene = SceneSnapshot::default();
        scene.nodes.push(SceneNode::mesh(
            "A",
            GeometryRef::new(GeometryKey::new("mesh0"), "Rock"),
        ));
        scene.nodes.push(SceneNode::mesh(
            "B",
            GeometryRef::new(GeometryKey::new("mesh1"), "Rock"),
        ));
        assert!(matches!(
            scene.validate(),
            Err(SceneError::DuplicateName {
                kind: "geometry",
                ..
            })
        ));
    }

    #[test]
    fn names_with_quotes_or_separators_are_rejected() {
        for name in ["a/b", "say \"hi\"", ""] {
            let mut scene = SceneSnapshot::default();
            scene.materials.push(Material::new(name));
            assert!(matches!(
                scene.validate(),
                Err(SceneError::InvalidName { .. })
            ));
        }
    }
}

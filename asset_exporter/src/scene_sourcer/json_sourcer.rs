use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use asset_common::{
    transform::{Transform, UpAxis},
    BlendingMode, GeometryKey, GeometryRef, ImageTable, Material, NodeFlags, NodeKind,
    ParallaxMode, SceneNode, SceneSnapshot, ShadowFilter, TextureRef, Textured,
};
use serde::Deserialize;
use ultraviolet::{Mat4, Vec3};

use crate::geometry_exporter::{GeometrySource, GeometryTable, TriangleMesh};

use super::{has_extension, LoadedScene, SceneSource};

/// Reads a scene description written as JSON.
///
/// ```json
/// {
///   "up_axis": "z",
///   "images": { "wood": "textures/wood.png" },
///   "geometries": { "Cube": { "file": "meshes/cube.obj" } },
///   "nodes": [{ "name": "Cube", "geometry": "Cube", "material": "Wood", "position": [0, 0, 1] }],
///   "materials": [{ "name": "Wood", "diffuse_texture": "wood" }]
/// }
/// ```
///
/// A node with a `geometry` is a mesh, everything else is an empty.
/// Transforms are local to the parent.
pub struct JsonSceneSource {}

impl SceneSource for JsonSceneSource {
    fn can_potentially_handle(&self, path: &Path) -> bool {
        has_extension(path, &["json"])
    }

    fn load(&self, path: &Path) -> anyhow::Result<LoadedScene> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene {:?}", path))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&content, base_dir).with_context(|| format!("Invalid scene {:?}", path))
    }
}

impl JsonSceneSource {
    pub fn parse(content: &str, base_dir: impl Into<PathBuf>) -> anyhow::Result<LoadedScene> {
        let file: SceneFile = serde_json::from_str(content)?;
        let base_dir = base_dir.into();

        let mut scene = SceneSnapshot::new(file.up_axis, base_dir.clone());

        let mut images = ImageTable::new();
        for (name, path) in file.images {
            images.insert(name, path);
        }
        scene.images = images;

        let world_transforms = world_transforms(&file.nodes)?;
        for (node, world_transform) in file.nodes.into_iter().zip(world_transforms) {
            scene.nodes.push(node.into_scene_node(world_transform));
        }

        scene.materials = file
            .materials
            .into_iter()
            .map(MaterialFile::into_material)
            .collect();

        let geometry = file
            .geometries
            .into_iter()
            .map(|(name, geometry)| {
                let source = match geometry {
                    GeometryFile::File { file } => GeometrySource::File(base_dir.join(file)),
                    GeometryFile::Mesh(mesh) => GeometrySource::Mesh(mesh),
                };
                (GeometryKey::new(name), source)
            })
            .collect();

        Ok(LoadedScene { scene, geometry })
    }
}

#[derive(Deserialize)]
struct SceneFile {
    #[serde(default)]
    up_axis: UpAxis,
    #[serde(default)]
    images: HashMap<String, PathBuf>,
    #[serde(default)]
    geometries: HashMap<String, GeometryFile>,
    #[serde(default)]
    nodes: Vec<NodeFile>,
    #[serde(default)]
    materials: Vec<MaterialFile>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeometryFile {
    File { file: PathBuf },
    Mesh(TriangleMesh),
}

#[derive(Deserialize)]
struct NodeFile {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    geometry: Option<String>,
    #[serde(default)]
    material: Option<String>,
    #[serde(default)]
    position: [f32; 3],
    #[serde(default = "identity_rotation")]
    rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    scale: [f32; 3],
    #[serde(default)]
    flags: NodeFlags,
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl NodeFile {
    fn local_transform(&self) -> Mat4 {
        Mat4::from(Transform::from_arrays(
            self.position,
            self.rotation,
            self.scale,
        ))
    }

    fn into_scene_node(self, world_transform: Mat4) -> SceneNode {
        let local_transform = self.local_transform();
        let kind = match self.geometry {
            Some(geometry) => NodeKind::Mesh {
                geometry: GeometryRef::named(geometry),
                material: self.material,
            },
            None => {
                if let Some(material) = self.material {
                    log::warn!(
                        "Node {:?} has material {:?} but no geometry, ignoring the material",
                        self.name,
                        material
                    );
                }
                NodeKind::Empty
            }
        };
        SceneNode {
            name: self.name,
            kind,
            local_transform,
            world_transform,
            parent: self.parent,
            flags: self.flags,
        }
    }
}

/// Composes every node's transform with its ancestors', parents may come after children.
fn world_transforms(nodes: &[NodeFile]) -> anyhow::Result<Vec<Mat4>> {
    let by_name: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.name.as_str(), index))
        .collect();
    let parent_of = |index: usize| {
        nodes[index]
            .parent
            .as_deref()
            .and_then(|parent| by_name.get(parent).copied())
    };

    let mut world: Vec<Option<Mat4>> = vec![None; nodes.len()];
    for start in 0..nodes.len() {
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(index) = current {
            if world[index].is_some() {
                break;
            }
            if chain.len() > nodes.len() {
                anyhow::bail!("Node {:?} is its own ancestor", nodes[start].name);
            }
            chain.push(index);
            current = parent_of(index);
        }

        for &index in chain.iter().rev() {
            let parent_world = parent_of(index)
                .and_then(|parent| world[parent])
                .unwrap_or_else(Mat4::identity);
            world[index] = Some(parent_world * nodes[index].local_transform());
        }
    }

    Ok(world
        .into_iter()
        .map(|transform| transform.unwrap_or_else(Mat4::identity))
        .collect())
}

#[derive(Deserialize)]
#[serde(default)]
struct MaterialFile {
    name: String,
    diffuse: [f32; 3],
    diffuse_texture: Option<String>,
    roughness: f32,
    roughness_texture: Option<String>,
    metallic: f32,
    metallic_texture: Option<String>,
    emission: [f32; 3],
    emission_texture: Option<String>,
    energy: f32,
    normal_texture: Option<String>,
    height_texture: Option<String>,
    parallax_mode: ParallaxMode,
    parallax_scale: f32,
    parallax_bias: f32,
    shadeless: bool,
    culling: bool,
    color_write: bool,
    depth_write: bool,
    use_shadows: bool,
    use_fog: bool,
    shadow_filter: ShadowFilter,
    blending_mode: BlendingMode,
    transparency: f32,
}

impl Default for MaterialFile {
    fn default() -> Self {
        let defaults = Material::new("");
        let color = |value: Vec3| [value.x, value.y, value.z];
        Self {
            name: defaults.name,
            diffuse: color(defaults.diffuse.value),
            diffuse_texture: None,
            roughness: defaults.roughness.value,
            roughness_texture: None,
            metallic: defaults.metallic.value,
            metallic_texture: None,
            emission: color(defaults.emission.value),
            emission_texture: None,
            energy: defaults.energy,
            normal_texture: None,
            height_texture: None,
            parallax_mode: defaults.parallax_mode,
            parallax_scale: defaults.parallax_scale,
            parallax_bias: defaults.parallax_bias,
            shadeless: defaults.shadeless,
            culling: defaults.culling,
            color_write: defaults.color_write,
            depth_write: defaults.depth_write,
            use_shadows: defaults.use_shadows,
            use_fog: defaults.use_fog,
            shadow_filter: defaults.shadow_filter,
            blending_mode: defaults.blending_mode,
            transparency: defaults.transparency,
        }
    }
}

impl MaterialFile {
    fn into_material(self) -> Material {
        fn textured<T>(value: T, texture: Option<String>) -> Textured<T> {
            Textured {
                value,
                texture: non_empty(texture),
            }
        }

        Material {
            name: self.name,
            diffuse: textured(Vec3::from(self.diffuse), self.diffuse_texture),
            roughness: textured(self.roughness, self.roughness_texture),
            metallic: textured(self.metallic, self.metallic_texture),
            emission: textured(Vec3::from(self.emission), self.emission_texture),
            energy: self.energy,
            normal: non_empty(self.normal_texture),
            height: non_empty(self.height_texture),
            parallax_mode: self.parallax_mode,
            parallax_scale: self.parallax_scale,
            parallax_bias: self.parallax_bias,
            shadeless: self.shadeless,
            culling: self.culling,
            color_write: self.color_write,
            depth_write: self.depth_write,
            use_shadows: self.use_shadows,
            use_fog: self.use_fog,
            shadow_filter: self.shadow_filter,
            blending_mode: self.blending_mode,
            transparency: self.transparency,
        }
    }
}

/// An empty texture field means "no texture", like an unset file path in the host.
fn non_empty(texture: Option<String>) -> Option<TextureRef> {
    texture
        .filter(|texture| !texture.is_empty())
        .map(TextureRef::new)
}

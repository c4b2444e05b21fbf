use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use anyhow::Context;
use asset_common::{
    transform::{Transform, UpAxis},
    BlendingMode, GeometryKey, GeometryRef, ImageTable, Material, NodeFlags, NodeKind, SceneNode,
    SceneSnapshot, TextureRef, Textured,
};
use gltf::{image::Source, material::AlphaMode, Semantic};
use ultraviolet::{Mat4, Vec3};

use crate::geometry_exporter::{GeometrySource, GeometryTable, TriangleMesh};

use super::{has_extension, LoadedScene, SceneSource};

/// Reads the default scene of a `.gltf` or `.glb` file.
/// Meshes are deduplicated by their index, so instanced meshes are exported once.
pub struct GltfSceneSource {}

impl SceneSource for GltfSceneSource {
    fn can_potentially_handle(&self, path: &Path) -> bool {
        has_extension(path, &["gltf", "glb"])
    }

    fn load(&self, path: &Path) -> anyhow::Result<LoadedScene> {
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        // Images are only referenced by path, so only the buffers get loaded.
        let buffers = gltf::import_buffers(&document, Some(base_dir.as_path()), blob)
            .with_context(|| format!("Failed to load the buffers of {:?}", path))?;

        let mut loading_data = SceneLoadingData::new(&document, &buffers, base_dir);
        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    loading_data.load_node(&node, None);
                }
            }
            None => log::warn!("{:?} contains no scene", path),
        }

        Ok(loading_data.finish())
    }
}

//////////////////////// IMPLEMENTATION ////////////////////////

struct SceneLoadingData<'a> {
    buffers: &'a [gltf::buffer::Data],
    scene: SceneSnapshot,
    geometry: GeometryTable,
    material_names: Vec<String>,
}

struct ParentInfo<'a> {
    name: &'a str,
    world_transform: Mat4,
}

impl<'a> SceneLoadingData<'a> {
    fn new(
        document: &gltf::Document,
        buffers: &'a [gltf::buffer::Data],
        base_dir: PathBuf,
    ) -> Self {
        let mut scene = SceneSnapshot::new(UpAxis::Y, base_dir);
        scene.images = load_image_table(document);

        let material_names: Vec<String> = document.materials().map(material_name).collect();
        scene.materials = document
            .materials()
            .zip(material_names.iter())
            .map(|(material, name)| load_material(&material, name))
            .collect();

        Self {
            buffers,
            scene,
            geometry: GeometryTable::new(),
            material_names,
        }
    }

    fn finish(self) -> LoadedScene {
        LoadedScene {
            scene: self.scene,
            geometry: self.geometry,
        }
    }

    fn load_node(&mut self, node: &gltf::Node<'_>, parent: Option<&ParentInfo<'_>>) {
        let name = node
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Node{}", node.index()));

        let local_transform = {
            let (position, orientation, scale) = node.transform().decomposed();
            Mat4::from(Transform::from_arrays(position, orientation, scale))
        };
        let world_transform = match parent {
            Some(parent) => parent.world_transform * local_transform,
            None => local_transform,
        };

        let kind = match node.mesh() {
            Some(mesh) => {
                let geometry = self.load_mesh(&mesh);
                let material = mesh
                    .primitives()
                    .find_map(|primitive| primitive.material().index())
                    .and_then(|index| self.material_names.get(index).cloned());
                NodeKind::Mesh { geometry, material }
            }
            None => NodeKind::Empty,
        };

        self.scene.nodes.push(SceneNode {
            name: name.clone(),
            kind,
            local_transform,
            world_transform,
            parent: parent.map(|parent| parent.name.to_string()),
            flags: NodeFlags::default(),
        });

        let this = ParentInfo {
            name: &name,
            world_transform,
        };
        for child in node.children() {
            self.load_node(&child, Some(&this));
        }
    }

    fn load_mesh(&mut self, mesh: &gltf::Mesh<'_>) -> GeometryRef {
        let key = GeometryKey::new(format!("mesh{}", mesh.index()));
        let name = mesh
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Mesh{}", mesh.index()));
        let geometry = GeometryRef::new(key.clone(), name);

        if self.geometry.contains_key(&key) {
            return geometry;
        }

        let buffers = self.buffers;
        let mut triangles = TriangleMesh::default();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping a {:?} primitive of mesh {:?}, only triangles are exported",
                    primitive.mode(),
                    geometry.name
                );
                continue;
            }
            if primitive.get(&Semantic::Positions).is_none() {
                continue;
            }
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|v| &v.0[..]));
            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(positions) => positions.collect(),
                None => continue,
            };
            let normals = reader
                .read_normals()
                .map(|normals| normals.collect())
                .unwrap_or_default();
            // glTF has its texture origin in the top left corner
            let uvs = reader
                .read_tex_coords(0)
                .map(|uvs| uvs.into_f32().map(|[u, v]| [u, 1.0 - v]).collect())
                .unwrap_or_default();
            let indices = reader
                .read_indices()
                .map(|indices| indices.into_u32().collect())
                .unwrap_or_else(|| (0..(positions.len() as u32)).collect());

            triangles.append(TriangleMesh {
                positions,
                normals,
                uvs,
                indices,
            });
        }

        self.geometry.insert(key, GeometrySource::Mesh(triangles));
        geometry
    }
}

fn material_name(material: gltf::Material<'_>) -> String {
    material
        .name()
        .map(String::from)
        .unwrap_or_else(|| format!("Material{}", material.index().unwrap_or_default()))
}

fn load_material(material: &gltf::Material<'_>, name: &str) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, alpha] = pbr.base_color_factor();
    let emissive: Vec3 = material.emissive_factor().into();

    let mut result = Material::new(name);
    result.diffuse = Textured {
        value: Vec3::new(r, g, b),
        texture: pbr
            .base_color_texture()
            .and_then(|info| image_reference(info.texture())),
    };
    result.roughness = Textured::value(pbr.roughness_factor());
    result.metallic = Textured::value(pbr.metallic_factor());
    if pbr.metallic_roughness_texture().is_some() {
        log::warn!(
            "Material {:?} packs metallic and roughness into one texture, using the factors instead",
            name
        );
    }
    result.emission = Textured {
        value: emissive,
        texture: material
            .emissive_texture()
            .and_then(|info| image_reference(info.texture())),
    };
    result.energy = if emissive != Vec3::zero() || result.emission.texture.is_some() {
        material.emissive_strength().unwrap_or(1.0)
    } else {
        0.0
    };
    result.normal = material
        .normal_texture()
        .and_then(|normal| image_reference(normal.texture()));
    result.culling = !material.double_sided();
    result.blending_mode = match material.alpha_mode() {
        AlphaMode::Blend => BlendingMode::Transparent,
        AlphaMode::Opaque | AlphaMode::Mask => BlendingMode::Opaque,
    };
    result.transparency = alpha;
    result
}

/// Named images go through the image table, unnamed ones are referenced by their URI.
fn image_reference(texture: gltf::Texture<'_>) -> Option<TextureRef> {
    let image = texture.source();
    match image.source() {
        Source::Uri { uri, .. } if !uri.starts_with("data:") => match image.name() {
            Some(name) => Some(TextureRef::new(name)),
            None => Some(TextureRef::new(decode_uri(uri))),
        },
        _ => {
            log::warn!(
                "Image {} is embedded in the file and can't be exported as a texture",
                image.index()
            );
            None
        }
    }
}

fn load_image_table(document: &gltf::Document) -> ImageTable {
    let mut images = ImageTable::new();
    for image in document.images() {
        if let (Some(name), Source::Uri { uri, .. }) = (image.name(), image.source()) {
            if !uri.starts_with("data:") {
                images.insert(name, decode_uri(uri).into_owned());
            }
        }
    }
    images
}

/// Relative URIs in glTF are percent-encoded, file names on disk are not.
fn decode_uri(uri: &str) -> Cow<'_, str> {
    urlencoding::decode(uri).unwrap_or_else(|_| {
        log::warn!("Image URI {:?} does not decode to UTF-8, using it as is", uri);
        Cow::Borrowed(uri)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // One triangle, instanced twice, with a textured material.
    const SCENE: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 2] }],
        "nodes": [
            { "name": "Parent", "translation": [0, 0, -2], "children": [1] },
            { "name": "Child", "mesh": 0, "translation": [1, 0, 0] },
            { "mesh": 0 }
        ],
        "meshes": [{
            "name": "Tri",
            "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }]
        }],
        "materials": [{
            "name": "Wood",
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 }, "roughnessFactor": 0.25 },
            "doubleSided": true
        }],
        "textures": [{ "source": 0 }],
        "images": [{ "name": "wood", "uri": "wood.png" }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0, 0, 0], "max": [1, 1, 0]
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }]
    }"#;

    fn load_source(source: &str) -> LoadedScene {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scene.gltf");
        std::fs::write(&path, source).expect("write");
        GltfSceneSource {}.load(&path).expect("load")
    }

    fn load() -> LoadedScene {
        load_source(SCENE)
    }

    #[test]
    fn nodes_are_flattened_in_pre_order() {
        let loaded = load();
        let names: Vec<&str> = loaded
            .scene
            .nodes
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, ["Parent", "Child", "Node2"]);
        assert_eq!(loaded.scene.up_axis, UpAxis::Y);

        let child = &loaded.scene.nodes[1];
        assert_eq!(child.parent.as_deref(), Some("Parent"));
        assert_eq!(child.kind.material(), Some("Wood"));
        let origin = child.world_transform.transform_point3(Vec3::zero());
        assert_eq!((origin.x, origin.y, origin.z), (1.0, 0.0, -2.0));
    }

    #[test]
    fn instanced_meshes_share_one_geometry() {
        let loaded = load();
        assert_eq!(loaded.geometry.len(), 1);
        let first = loaded.scene.nodes[1].kind.geometry().expect("mesh");
        let second = loaded.scene.nodes[2].kind.geometry().expect("mesh");
        assert_eq!(first, second);
        assert_eq!(first.name, "Tri");
        match loaded.geometry.get(&first.key) {
            Some(GeometrySource::Mesh(mesh)) => {
                assert_eq!(mesh.positions.len(), 3);
                assert_eq!(mesh.indices, [0, 1, 2]);
            }
            other => panic!("expected an in-memory mesh, got {other:?}"),
        }
    }

    #[test]
    fn materials_reference_images_by_name() {
        let loaded = load();
        let material = &loaded.scene.materials[0];
        assert_eq!(material.name, "Wood");
        assert_eq!(material.diffuse.texture, Some(TextureRef::new("wood")));
        assert_eq!(material.roughness.value, 0.25);
        assert!(!material.culling);
        assert_eq!(material.energy, 0.0);
        assert_eq!(
            loaded.scene.images.get("wood"),
            Some(std::path::Path::new("wood.png"))
        );
    }

    #[test]
    fn image_uris_are_percent_decoded() {
        let loaded = load_source(
            r#"{
                "asset": { "version": "2.0" },
                "materials": [{
                    "name": "Bark",
                    "pbrMetallicRoughness": { "baseColorTexture": { "index": 1 } },
                    "emissiveTexture": { "index": 0 }
                }],
                "textures": [{ "source": 0 }, { "source": 1 }],
                "images": [
                    { "name": "wood", "uri": "old%20wood.png" },
                    { "uri": "tex/bark%20dark.png" }
                ]
            }"#,
        );

        assert_eq!(
            loaded.scene.images.get("wood"),
            Some(std::path::Path::new("old wood.png"))
        );
        let material = &loaded.scene.materials[0];
        assert_eq!(material.emission.texture, Some(TextureRef::new("wood")));
        assert_eq!(
            material.diffuse.texture,
            Some(TextureRef::new("tex/bark dark.png"))
        );
    }

    #[test]
    fn unnamed_materials_are_named_by_index() {
        let loaded = load_source(
            r#"{
                "asset": { "version": "2.0" },
                "materials": [{ "name": "First" }, {}]
            }"#,
        );
        let names: Vec<&str> = loaded
            .scene
            .materials
            .iter()
            .map(|material| material.name.as_str())
            .collect();
        assert_eq!(names, ["First", "Material1"]);
    }
}

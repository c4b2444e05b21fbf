use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use asset_common::{
    transform::AxisConversion, GeometryKey, Material, NodeKind, ResolvedTexture, SceneNode,
    SceneSnapshot, TextureSlot,
};

use crate::{
    descriptor::{EntityRecord, MaterialRecord},
    error::{ExportError, ExportWarning},
    export_config::ExportConfig,
    geometry_exporter::{GeometryExporter, TransformOverride},
    logical_path::LogicalPath,
    staging::{CopyOutcome, StagingDir},
};

/// A file that goes into the archive, and where its bytes currently live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackEntry {
    pub logical_path: LogicalPath,
    pub source: PathBuf,
}

#[derive(Debug, Default)]
pub struct CollectedAssets {
    /// In archive order, the index is always last.
    pub entries: Vec<PackEntry>,
    /// Entity descriptors in scene order, the content of the index.
    pub entities: Vec<LogicalPath>,
    pub warnings: Vec<ExportWarning>,
}

/// Materializes every archive entry of a scene in the staging directory.
///
/// Walks the nodes, then the materials, then picks up images nobody referenced,
/// and finally writes the index.
pub struct AssetCollector<'a> {
    config: &'a ExportConfig,
    staging: &'a StagingDir,
    collected: CollectedAssets,
    /// Staged file names that already have an entry.
    registered_files: HashSet<String>,
    exported_geometry: HashMap<GeometryKey, LogicalPath>,
    /// Keyed by the canonical source path, so `..` and symlinks don't count as new files.
    texture_paths: HashMap<PathBuf, LogicalPath>,
    /// Which source a staged texture was copied from.
    staged_textures: HashMap<String, PathBuf>,
}

impl<'a> AssetCollector<'a> {
    pub fn new(config: &'a ExportConfig, staging: &'a StagingDir) -> Self {
        Self {
            config,
            staging,
            collected: CollectedAssets::default(),
            registered_files: HashSet::new(),
            exported_geometry: HashMap::new(),
            texture_paths: HashMap::new(),
            staged_textures: HashMap::new(),
        }
    }

    /// Runs every step in order. Node transforms are only touched while their geometry
    /// is being exported and are back to normal when this returns, even on failure.
    pub fn collect(
        mut self,
        scene: &mut SceneSnapshot,
        exporter: &mut dyn GeometryExporter,
    ) -> Result<CollectedAssets, ExportError> {
        self.collect_nodes(scene, exporter)?;
        self.collect_materials(scene)?;
        self.collect_leftover_images();
        self.finish()
    }

    fn collect_nodes(
        &mut self,
        scene: &mut SceneSnapshot,
        exporter: &mut dyn GeometryExporter,
    ) -> Result<(), ExportError> {
        let axis_conversion = scene.axis_conversion();
        let node_names: HashSet<String> =
            scene.nodes.iter().map(|node| node.name.clone()).collect();

        for index in 0..scene.nodes.len() {
            let mesh = self.export_geometry(&mut scene.nodes[index], exporter)?;

            let node = &scene.nodes[index];
            if let Some(material) = node.kind.material() {
                if scene.material(material).is_none() {
                    log::warn!(
                        "Node {:?} uses material {:?}, which is not part of the scene",
                        node.name,
                        material
                    );
                }
            }
            let entity = self.write_entity(node, mesh.as_ref(), &node_names, axis_conversion)?;

            if matches!(node.kind, NodeKind::Mesh { .. } | NodeKind::Empty) {
                self.collected.entities.push(entity);
            }
        }
        Ok(())
    }

    /// Exports the geometry of a mesh node the first time its key shows up.
    fn export_geometry(
        &mut self,
        node: &mut SceneNode,
        exporter: &mut dyn GeometryExporter,
    ) -> Result<Option<LogicalPath>, ExportError> {
        let geometry = match node.kind.geometry() {
            Some(geometry) => geometry.clone(),
            None => return Ok(None),
        };
        if let Some(logical_path) = self.exported_geometry.get(&geometry.key) {
            return Ok(Some(logical_path.clone()));
        }

        let file_name = format!("{}.{}", geometry.name, exporter.extension());
        let destination = self.staging.file_path(&file_name);
        let node_name = node.name.clone();
        {
            let guard = TransformOverride::identity(node);
            exporter
                .export(guard.node(), &destination)
                .map_err(|source| ExportError::GeometryExport {
                    node: node_name,
                    source,
                })?;
        }
        log::info!("Exported geometry {} to {:?}", geometry.key, destination);

        let logical_path = self.register(file_name, destination);
        self.exported_geometry
            .insert(geometry.key, logical_path.clone());
        Ok(Some(logical_path))
    }

    fn write_entity(
        &mut self,
        node: &SceneNode,
        mesh: Option<&LogicalPath>,
        node_names: &HashSet<String>,
        axis_conversion: AxisConversion,
    ) -> Result<LogicalPath, ExportError> {
        let parent = node.parent.as_ref().map(|parent| {
            if !node_names.contains(parent) {
                self.warn(ExportWarning::UnknownParent {
                    node: node.name.clone(),
                    parent: parent.clone(),
                });
            }
            self.config.logical_path(&format!("{parent}.entity"))
        });
        // Children store their transform relative to the parent, which the local
        // transform already is. Re-deriving it from world matrices would lose precision.
        let transform = match parent {
            Some(_) => axis_conversion.decompose(&node.local_transform),
            None => axis_conversion.decompose(&node.world_transform),
        };
        let material = node
            .kind
            .material()
            .map(|material| self.config.logical_path(&format!("{material}.mat")));

        let descriptor = EntityRecord {
            name: &node.name,
            parent: parent.as_ref(),
            transform,
            mesh,
            material: material.as_ref(),
            flags: node.flags,
        }
        .to_descriptor();

        let file_name = format!("{}.entity", node.name);
        let source = self.staging.write_file(&file_name, descriptor.as_bytes())?;
        Ok(self.register(file_name, source))
    }

    fn collect_materials(&mut self, scene: &SceneSnapshot) -> Result<(), ExportError> {
        for material in scene.materials.iter() {
            let mut textures = HashMap::new();
            let mut new_textures = Vec::new();
            for (slot, source) in self.resolve_textures(scene, material) {
                let logical_path =
                    self.stage_texture(&material.name, &source, &mut new_textures)?;
                textures.insert(slot, logical_path);
            }

            let descriptor = MaterialRecord {
                material,
                textures: &textures,
            }
            .to_descriptor();
            let file_name = format!("{}.mat", material.name);
            let source = self.staging.write_file(&file_name, descriptor.as_bytes())?;
            self.register(file_name, source);

            for (file_name, source) in new_textures {
                self.register(file_name, source);
            }
        }
        Ok(())
    }

    fn resolve_textures(
        &mut self,
        scene: &SceneSnapshot,
        material: &Material,
    ) -> Vec<(TextureSlot, PathBuf)> {
        let mut resolved = Vec::new();
        for (slot, reference) in material.textures() {
            let path = match scene.images.resolve(reference, scene.base_dir()) {
                ResolvedTexture::Image(path) => path,
                ResolvedTexture::RawPath(path) => {
                    self.warn(ExportWarning::UnresolvedTextureReference {
                        material: material.name.clone(),
                        reference: reference.to_string(),
                    });
                    path
                }
            };
            resolved.push((slot, path));
        }
        resolved
    }

    /// Copies a texture into the staging directory and returns its archive path.
    /// Textures that need a new entry are appended to `new_textures`.
    fn stage_texture(
        &mut self,
        material: &str,
        source: &Path,
        new_textures: &mut Vec<(String, PathBuf)>,
    ) -> Result<LogicalPath, ExportError> {
        // Missing files keep their raw path and fail in the copy below.
        let identity = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
        if let Some(logical_path) = self.texture_paths.get(&identity) {
            return Ok(logical_path.clone());
        }

        let outcome =
            self.staging
                .copy_in(source)
                .map_err(|err| ExportError::MissingSource {
                    logical_path: format!("texture of material {material}"),
                    path: source.to_path_buf(),
                    source: err,
                })?;
        let file_name = file_name_of(outcome.path());

        match (&outcome, self.staged_textures.get(&file_name).cloned()) {
            (CopyOutcome::AlreadyPresent(_), Some(kept)) => {
                self.warn(ExportWarning::CopyCollision {
                    file_name: file_name.clone(),
                    skipped: source.to_path_buf(),
                    kept,
                });
            }
            // Either freshly copied, or written by something other than a texture copy.
            _ => {
                self.staged_textures
                    .insert(file_name.clone(), source.to_path_buf());
            }
        }

        let logical_path = self.config.logical_path(&file_name);
        let pending = new_textures.iter().any(|(name, _)| *name == file_name);
        if !pending && !self.registered_files.contains(&file_name) {
            new_textures.push((file_name, outcome.path().to_path_buf()));
        }
        self.texture_paths.insert(identity, logical_path.clone());
        Ok(logical_path)
    }

    /// Images that ended up in the staging directory without being referenced.
    fn collect_leftover_images(&mut self) {
        for path in self.staging.files() {
            let file_name = file_name_of(&path);
            if !self.config.is_image_file(&path) || self.registered_files.contains(&file_name) {
                continue;
            }
            log::debug!("Packing unreferenced image {:?}", path);
            self.register(file_name, path);
        }
    }

    /// Writes the index and hands everything over.
    fn finish(mut self) -> Result<CollectedAssets, ExportError> {
        let mut index = String::new();
        for entity in self.collected.entities.iter() {
            index.push_str(entity.as_str());
            index.push('\n');
        }
        let file_name = self.config.index_name.clone();
        let source = self.staging.write_file(&file_name, index.as_bytes())?;
        let logical_path = self.config.index_path();
        self.registered_files.insert(file_name);
        self.collected.entries.push(PackEntry {
            logical_path,
            source,
        });
        Ok(self.collected)
    }

    fn register(&mut self, file_name: String, source: PathBuf) -> LogicalPath {
        let logical_path = self.config.logical_path(&file_name);
        self.registered_files.insert(file_name);
        self.collected.entries.push(PackEntry {
            logical_path: logical_path.clone(),
            source,
        });
        logical_path
    }

    fn warn(&mut self, warning: ExportWarning) {
        log::warn!("{}", warning);
        self.collected.warnings.push(warning);
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

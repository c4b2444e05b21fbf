pub mod archive_packer;
pub mod asset_collector;
pub mod cli;
pub mod descriptor;
pub mod error;
pub mod export_config;
pub mod geometry_exporter;
pub mod logical_path;
pub mod scene_sourcer;
pub mod staging;

use std::path::PathBuf;

use asset_common::{archive::ArchiveEntry, SceneSnapshot};

use crate::{
    archive_packer::pack_archive,
    asset_collector::AssetCollector,
    error::{ExportError, ExportWarning},
    export_config::ExportConfig,
    geometry_exporter::GeometryExporter,
    staging::StagingDir,
};

/// What a successful export produced.
#[derive(Debug)]
pub struct ExportReport {
    pub archive_path: PathBuf,
    /// The index of the written archive.
    pub entries: Vec<ArchiveEntry>,
    pub warnings: Vec<ExportWarning>,
}

/// Exports a scene into a single BOXF archive.
///
/// Every entry is first written to the staging directory next to the archive,
/// which is wiped if it already exists. The staged files are left behind afterwards.
/// Node transforms are only changed while their geometry is being exported.
pub fn export_scene(
    config: &ExportConfig,
    scene: &mut SceneSnapshot,
    exporter: &mut dyn GeometryExporter,
) -> Result<ExportReport, ExportError> {
    scene.validate()?;

    let (staging, replaced) = StagingDir::recreate(config.get_staging_dir())?;
    let mut warnings = Vec::new();
    if replaced {
        warnings.push(ExportWarning::ReplacedOutputDirectory(
            staging.path().to_path_buf(),
        ));
    }

    let collected = AssetCollector::new(config, &staging).collect(scene, exporter)?;
    warnings.extend(collected.warnings);
    log::info!(
        "Collected {} entries for {} entities",
        collected.entries.len(),
        collected.entities.len()
    );

    let entries = pack_archive(&config.archive_path, &collected.entries)?;
    Ok(ExportReport {
        archive_path: config.archive_path.clone(),
        entries,
        warnings,
    })
}

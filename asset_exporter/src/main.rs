use anyhow::Context;
use asset_exporter::{
    cli::CliArgs,
    export_scene,
    geometry_exporter::SceneGeometryExporter,
    scene_sourcer::{scene_sources, LoadedScene},
};
use env_logger::Env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse_from_env()?;
    let scene_path = args.scene.clone();
    let config = args.into_export_config()?;

    let scene_source = scene_sources()
        .into_iter()
        .find(|source| source.can_potentially_handle(&scene_path))
        .ok_or_else(|| anyhow::format_err!("No scene source can read {:?}", scene_path))?;
    let LoadedScene {
        mut scene,
        geometry,
    } = scene_source.load(&scene_path)?;
    log::info!(
        "Loaded {} nodes and {} materials from {:?}",
        scene.nodes.len(),
        scene.materials.len(),
        scene_path
    );

    let mut exporter = SceneGeometryExporter::new(geometry, scene.up_axis);
    let report = export_scene(&config, &mut scene, &mut exporter)
        .with_context(|| format!("Failed to export {:?}", scene_path))?;

    if !report.warnings.is_empty() {
        log::warn!("Finished with {} warnings", report.warnings.len());
    }
    println!("{:>12} {:>12}  path", "offset", "size");
    for entry in report.entries.iter() {
        println!(
            "{:>12} {:>12}  {}",
            entry.data_offset, entry.data_size, entry.logical_path
        );
    }
    println!(
        "Wrote {} entries to {:?}",
        report.entries.len(),
        report.archive_path
    );
    Ok(())
}

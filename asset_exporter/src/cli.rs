use std::{env, path::PathBuf};

use anyhow::{anyhow, bail, Result};

use crate::export_config::ExportConfig;

const USAGE: &str = concat!(
    "Usage: asset_exporter <scene.(json|gltf|glb)> <output.asset> ",
    "[--config <settings.json>] [--prefix <prefix>]"
);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliArgs {
    pub scene: PathBuf,
    pub archive: PathBuf,
    pub config: Option<PathBuf>,
    pub prefix: Option<String>,
}

impl CliArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CliArgs::default();
        let mut positionals = Vec::new();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_arg) = iter.next() {
            let arg = raw_arg.as_ref();
            let Some(key) = arg.strip_prefix("--") else {
                positionals.push(arg.to_string());
                continue;
            };
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("Expected a value after '{arg}'"))?
                .as_ref()
                .to_string();
            match key {
                "config" => parsed.config = Some(value.into()),
                "prefix" => parsed.prefix = Some(value),
                _ => bail!("Unknown flag '{arg}'. Supported flags: --config, --prefix.\n{USAGE}"),
            }
        }

        match positionals.as_slice() {
            [scene, archive] => {
                parsed.scene = scene.into();
                parsed.archive = archive.into();
            }
            _ => bail!("Expected a scene and an output path.\n{USAGE}"),
        }
        Ok(parsed)
    }

    /// Settings file first, then the command line on top.
    pub fn into_export_config(self) -> Result<ExportConfig> {
        let mut config = match &self.config {
            Some(path) => ExportConfig::from_json_file(path)?,
            None => ExportConfig::default(),
        };
        config.archive_path = self.archive;
        if let Some(prefix) = self.prefix {
            config.logical_prefix = prefix;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positionals_and_flags_in_any_order() {
        let args = ["app", "--prefix", "level", "scene.json", "out/level.asset"];
        let parsed = CliArgs::parse(args).expect("parse args");
        assert_eq!(parsed.scene, PathBuf::from("scene.json"));
        assert_eq!(parsed.archive, PathBuf::from("out/level.asset"));
        assert_eq!(parsed.prefix.as_deref(), Some("level"));
        assert_eq!(parsed.config, None);
    }

    #[test]
    fn missing_output_errors() {
        let err = CliArgs::parse(["app", "scene.json"]).unwrap_err();
        assert!(err.to_string().contains("Expected a scene and an output path"));
    }

    #[test]
    fn missing_value_errors() {
        let err = CliArgs::parse(["app", "a.json", "b.asset", "--config"]).unwrap_err();
        assert!(err.to_string().contains("Expected a value"), "error should mention missing value");
    }

    #[test]
    fn rejects_unknown_flags() {
        let err = CliArgs::parse(["app", "--foo", "bar"]).unwrap_err();
        assert!(err.to_string().contains("Unknown flag"), "unknown flags should error");
    }

    #[test]
    fn command_line_overrides_the_settings_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = dir.path().join("settings.json");
        std::fs::write(
            &settings,
            r#"{ "logical_prefix": "from_file", "index_name": "MANIFEST" }"#,
        )
        .expect("write");
        let args = CliArgs {
            scene: "scene.json".into(),
            archive: "out.asset".into(),
            config: Some(settings),
            prefix: Some("from_cli".into()),
        };

        let config = args.into_export_config().expect("config");
        assert_eq!(config.archive_path, PathBuf::from("out.asset"));
        assert_eq!(config.logical_prefix, "from_cli");
        assert_eq!(config.index_name, "MANIFEST");
    }
}

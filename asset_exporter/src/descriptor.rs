//! Text descriptors for entities and materials.
//!
//! Every line is a `key: value;` statement. The field order is fixed so that the same
//! scene always produces byte identical files.

use std::collections::HashMap;

use asset_common::{transform::Transform, Material, NodeFlags, TextureSlot};
use ultraviolet::Vec3;

use crate::logical_path::LogicalPath;

/// Everything that goes into an `.entity` file.
pub struct EntityRecord<'a> {
    pub name: &'a str,
    pub parent: Option<&'a LogicalPath>,
    /// Already in archive space.
    pub transform: Transform,
    pub mesh: Option<&'a LogicalPath>,
    pub material: Option<&'a LogicalPath>,
    pub flags: NodeFlags,
}

impl EntityRecord<'_> {
    pub fn to_descriptor(&self) -> String {
        let mut writer = DescriptorWriter::new();
        writer.string("name", self.name);
        if let Some(parent) = self.parent {
            writer.string("parent", parent.as_str());
        }
        writer.vector("position", &self.transform.position_array());
        writer.vector("rotation", &self.transform.rotation_array());
        writer.vector("scale", &self.transform.scale_array());
        if let Some(mesh) = self.mesh {
            writer.string("mesh", mesh.as_str());
        }
        if let Some(material) = self.material {
            writer.string("material", material.as_str());
        }
        writer.flag("visible", self.flags.visible);
        writer.flag("castShadow", self.flags.cast_shadow);
        writer.flag("useMotionBlur", self.flags.use_motion_blur);
        writer.flag("solid", self.flags.solid);
        writer.integer("layer", self.flags.layer.into());
        writer.finish()
    }
}

/// Everything that goes into a `.mat` file.
/// `textures` holds the archive path of every texture slot that is set.
pub struct MaterialRecord<'a> {
    pub material: &'a Material,
    pub textures: &'a HashMap<TextureSlot, LogicalPath>,
}

impl MaterialRecord<'_> {
    pub fn to_descriptor(&self) -> String {
        let material = self.material;
        let texture = |slot| self.textures.get(&slot);

        let mut writer = DescriptorWriter::new();
        writer.string("name", &material.name);
        match texture(TextureSlot::Diffuse) {
            Some(path) => writer.string("diffuse", path.as_str()),
            None => writer.color("diffuse", material.diffuse.value),
        }
        match texture(TextureSlot::Roughness) {
            Some(path) => writer.string("roughness", path.as_str()),
            None => writer.number("roughness", material.roughness.value),
        }
        match texture(TextureSlot::Metallic) {
            Some(path) => writer.string("metallic", path.as_str()),
            None => writer.number("metallic", material.metallic.value),
        }
        match texture(TextureSlot::Emission) {
            Some(path) => writer.string("emission", path.as_str()),
            None => writer.color("emission", material.emission.value),
        }
        writer.number("energy", material.energy);
        if let Some(path) = texture(TextureSlot::Normal) {
            writer.string("normal", path.as_str());
        }
        if let Some(path) = texture(TextureSlot::Height) {
            writer.string("height", path.as_str());
        }
        writer.integer("parallax", material.parallax_mode.code().into());
        writer.number("parallaxScale", material.parallax_scale);
        writer.number("parallaxBias", material.parallax_bias);
        writer.flag("shadeless", material.shadeless);
        writer.flag("culling", material.culling);
        writer.flag("colorWrite", material.color_write);
        writer.flag("depthWrite", material.depth_write);
        writer.flag("useShadows", material.use_shadows);
        writer.flag("useFog", material.use_fog);
        writer.integer("shadowFilter", material.shadow_filter.code().into());
        writer.integer("blendingMode", material.blending_mode.code().into());
        writer.number("transparency", material.transparency);
        writer.finish()
    }
}

struct DescriptorWriter {
    text: String,
}

impl DescriptorWriter {
    fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    fn statement(&mut self, key: &str, value: &str) {
        self.text.push_str(key);
        self.text.push_str(": ");
        self.text.push_str(value);
        self.text.push_str(";\n");
    }

    /// Names and paths are known to be free of quotes.
    fn string(&mut self, key: &str, value: &str) {
        self.statement(key, &format!("\"{value}\""));
    }

    fn number(&mut self, key: &str, value: f32) {
        self.statement(key, &format_float(value));
    }

    fn integer(&mut self, key: &str, value: i64) {
        self.statement(key, &value.to_string());
    }

    fn flag(&mut self, key: &str, value: bool) {
        self.statement(key, if value { "1" } else { "0" });
    }

    fn vector(&mut self, key: &str, values: &[f32]) {
        let values: Vec<String> = values.iter().copied().map(format_float).collect();
        self.statement(key, &format!("[{}]", values.join(", ")));
    }

    fn color(&mut self, key: &str, color: Vec3) {
        self.vector(key, &[color.x, color.y, color.z]);
    }

    fn finish(self) -> String {
        self.text
    }
}

/// Shortest decimal that reads back as the same `f32`, independent of locale.
/// Whole numbers have no fractional part, negative zero is written as `0`.
pub fn format_float(value: f32) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

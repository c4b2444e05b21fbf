use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

use super::texture::TextureRef;

/// A literal value that a texture can replace.
#[derive(Debug, Clone, PartialEq)]
pub struct Textured<T> {
    pub value: T,
    pub texture: Option<TextureRef>,
}

impl<T> Textured<T> {
    pub fn value(value: T) -> Self {
        Self {
            value,
            texture: None,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallaxMode {
    #[default]
    None,
    Simple,
    OcclusionMapping,
}

impl ParallaxMode {
    pub fn code(self) -> u32 {
        match self {
            ParallaxMode::None => 0,
            ParallaxMode::Simple => 1,
            ParallaxMode::OcclusionMapping => 2,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowFilter {
    None,
    #[default]
    Pcf,
}

impl ShadowFilter {
    pub fn code(self) -> u32 {
        match self {
            ShadowFilter::None => 0,
            ShadowFilter::Pcf => 1,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendingMode {
    #[default]
    Opaque,
    Transparent,
    Additive,
}

impl BlendingMode {
    pub fn code(self) -> u32 {
        match self {
            BlendingMode::Opaque => 0,
            BlendingMode::Transparent => 1,
            BlendingMode::Additive => 2,
        }
    }
}

/// Slots that can carry a texture, in descriptor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    Roughness,
    Metallic,
    Emission,
    Normal,
    Height,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 6] = [
        TextureSlot::Diffuse,
        TextureSlot::Roughness,
        TextureSlot::Metallic,
        TextureSlot::Emission,
        TextureSlot::Normal,
        TextureSlot::Height,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: Textured<Vec3>,
    pub roughness: Textured<f32>,
    pub metallic: Textured<f32>,
    pub emission: Textured<Vec3>,
    pub energy: f32,
    /// No literal fallback, only written when set.
    pub normal: Option<TextureRef>,
    /// No literal fallback, only written when set.
    pub height: Option<TextureRef>,
    pub parallax_mode: ParallaxMode,
    pub parallax_scale: f32,
    pub parallax_bias: f32,
    pub shadeless: bool,
    pub culling: bool,
    pub color_write: bool,
    pub depth_write: bool,
    pub use_shadows: bool,
    pub use_fog: bool,
    pub shadow_filter: ShadowFilter,
    pub blending_mode: BlendingMode,
    pub transparency: f32,
}

impl Material {
    /// A material with the host's default property values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: Textured::value(Vec3::new(0.8, 0.8, 0.8)),
            roughness: Textured::value(0.5),
            metallic: Textured::value(0.0),
            emission: Textured::value(Vec3::zero()),
            energy: 0.0,
            normal: None,
            height: None,
            parallax_mode: ParallaxMode::None,
            parallax_scale: 0.03,
            parallax_bias: -0.01,
            shadeless: false,
            culling: true,
            color_write: true,
            depth_write: true,
            use_shadows: true,
            use_fog: true,
            shadow_filter: ShadowFilter::Pcf,
            blending_mode: BlendingMode::Opaque,
            transparency: 1.0,
        }
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<&TextureRef> {
        match slot {
            TextureSlot::Diffuse => self.diffuse.texture.as_ref(),
            TextureSlot::Roughness => self.roughness.texture.as_ref(),
            TextureSlot::Metallic => self.metallic.texture.as_ref(),
            TextureSlot::Emission => self.emission.texture.as_ref(),
            TextureSlot::Normal => self.normal.as_ref(),
            TextureSlot::Height => self.height.as_ref(),
        }
    }

    /// Every texture this material references, in descriptor order.
    pub fn textures(&self) -> impl Iterator<Item = (TextureSlot, &TextureRef)> {
        TextureSlot::ALL
            .into_iter()
            .filter_map(|slot| self.texture(slot).map(|texture| (slot, texture)))
    }
}

//! Display categories derived from a node's class type.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoStaticStr};

/// Display category of a node.
///
/// Used only as a colouring hint by display layers; nothing in comfyx
/// branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumIter, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccentCategory {
    /// Model and asset loaders.
    Loader,
    /// Samplers.
    Sampler,
    /// Text encoders and conditioning.
    Conditioning,
    /// VAE encode/decode.
    Vae,
    /// Save and preview sinks.
    Output,
    /// Latent image sources and transforms.
    Latent,
    /// ControlNet application.
    ControlNet,
    /// Anything else.
    #[default]
    Other,
}

/// Substring rules in priority order.
const RULES: &[(&[&str], AccentCategory)] = &[
    (&["loader", "checkpoint", "load"], AccentCategory::Loader),
    (&["sampler"], AccentCategory::Sampler),
    (&["clip", "encode", "conditioning"], AccentCategory::Conditioning),
    (&["vae", "decode"], AccentCategory::Vae),
    (&["save", "preview", "output"], AccentCategory::Output),
    (&["latent", "empty"], AccentCategory::Latent),
    (&["controlnet", "control"], AccentCategory::ControlNet),
];

impl AccentCategory {
    /// Derives the category from a class type, case-insensitively.
    pub fn from_class_type(class_type: &str) -> Self {
        let class_type = class_type.to_lowercase();
        RULES
            .iter()
            .find(|(needles, _)| needles.iter().any(|needle| class_type.contains(needle)))
            .map(|(_, category)| *category)
            .unwrap_or_default()
    }

    /// Returns the suggested accent colour as `#RRGGBB`.
    pub const fn hex_color(&self) -> &'static str {
        match self {
            Self::Loader => "#00F5FF",
            Self::Sampler => "#FF00FF",
            Self::Conditioning => "#BF00FF",
            Self::Vae => "#FF6B35",
            Self::Output => "#00FF88",
            Self::Latent => "#FFD700",
            Self::ControlNet => "#FF3366",
            Self::Other => "#808090",
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_from_class_type() {
        assert_eq!(
            AccentCategory::from_class_type("CheckpointLoaderSimple"),
            AccentCategory::Loader
        );
        assert_eq!(AccentCategory::from_class_type("KSampler"), AccentCategory::Sampler);
        assert_eq!(
            AccentCategory::from_class_type("CLIPTextEncode"),
            AccentCategory::Conditioning
        );
        assert_eq!(AccentCategory::from_class_type("VAEDecode"), AccentCategory::Vae);
        assert_eq!(AccentCategory::from_class_type("SaveImage"), AccentCategory::Output);
        assert_eq!(
            AccentCategory::from_class_type("EmptyLatentImage"),
            AccentCategory::Latent
        );
        assert_eq!(
            AccentCategory::from_class_type("ControlNetApply"),
            AccentCategory::ControlNet
        );
        assert_eq!(AccentCategory::from_class_type("ImageScale"), AccentCategory::Other);
    }

    #[test]
    fn test_rule_priority() {
        // "LoadImage" matches the loader rule before anything else.
        assert_eq!(AccentCategory::from_class_type("LoadImage"), AccentCategory::Loader);
        // "VAEEncode" hits the conditioning "encode" rule first.
        assert_eq!(
            AccentCategory::from_class_type("VAEEncode"),
            AccentCategory::Conditioning
        );
    }

    #[test]
    fn test_hex_colors_are_well_formed() {
        for category in AccentCategory::iter() {
            let color = category.hex_color();
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
        }
    }
}

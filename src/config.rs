//! Resource-layer configuration.
//!
//! Arena capacities are deployment decisions: they come from here instead of
//! compile-time constants. Every field has a default, so a config file only
//! needs to name what it changes.

use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse resource config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0} must be non-zero")]
    Zero(&'static str),
    #[error("max_load_factor must be a positive number, got {0}")]
    LoadFactor(f64),
}

/// Slot counts per resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaCapacities {
    pub images: usize,
    pub buffers: usize,
    pub shaders: usize,
    pub materials: usize,
    pub meshes: usize,
    pub renderers: usize,
    pub render_commands: usize,
}

impl Default for ArenaCapacities {
    fn default() -> Self {
        Self {
            images: 256,
            buffers: 1024,
            shaders: 128,
            materials: 256,
            meshes: 512,
            renderers: 8,
            render_commands: 4096,
        }
    }
}

impl ArenaCapacities {
    pub fn get(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Image => self.images,
            ResourceKind::Buffer => self.buffers,
            ResourceKind::Shader => self.shaders,
            ResourceKind::Material => self.materials,
            ResourceKind::Mesh => self.meshes,
            ResourceKind::Renderer => self.renderers,
            ResourceKind::RenderCommand => self.render_commands,
        }
    }

    fn field(kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Image => "capacities.images",
            ResourceKind::Buffer => "capacities.buffers",
            ResourceKind::Shader => "capacities.shaders",
            ResourceKind::Material => "capacities.materials",
            ResourceKind::Mesh => "capacities.meshes",
            ResourceKind::Renderer => "capacities.renderers",
            ResourceKind::RenderCommand => "capacities.render_commands",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub capacities: ArenaCapacities,
    /// Bucket count of the shader registry's map.
    pub shader_buckets: usize,
    /// Initial per-bucket list capacity for registry maps and per-renderer
    /// command lists.
    pub bucket_initial_capacity: usize,
    /// Registry load factor above which a warning is logged.
    pub max_load_factor: f64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            capacities: ArenaCapacities::default(),
            shader_buckets: 64,
            bucket_initial_capacity: 4,
            max_load_factor: 4.0,
        }
    }
}

impl ResourceConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: ResourceConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ResourceKind::ALL {
            if self.capacities.get(kind) == 0 {
                return Err(ConfigError::Zero(ArenaCapacities::field(kind)));
            }
        }
        if self.shader_buckets == 0 {
            return Err(ConfigError::Zero("shader_buckets"));
        }
        if self.bucket_initial_capacity == 0 {
            return Err(ConfigError::Zero("bucket_initial_capacity"));
        }
        if !(self.max_load_factor.is_finite() && self.max_load_factor > 0.0) {
            return Err(ConfigError::LoadFactor(self.max_load_factor));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ResourceConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = ResourceConfig::from_json(r#"{ "capacities": { "images": 3 }, "shader_buckets": 16 }"#)
            .unwrap();
        assert_eq!(c.capacities.images, 3);
        assert_eq!(c.capacities.meshes, ArenaCapacities::default().meshes);
        assert_eq!(c.shader_buckets, 16);
        assert_eq!(c.max_load_factor, 4.0);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = ResourceConfig::from_json(r#"{ "capacities": { "render_commands": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Zero("capacities.render_commands")));

        let err = ResourceConfig::from_json(r#"{ "max_load_factor": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFactor(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            ResourceConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}

//! Renderer configuration

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::enums::ColortableId;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Zoom floor applied when mapping device coordinates to the volume
    pub pick_min_scale: f64,
    /// Zoom floor applied to the blit transform
    pub render_min_scale: f64,
    /// Colortable installed when the renderer is created
    pub colortable: ColortableId,
    /// A window/level drag of 1.0 changes the window by 1/steps of its width
    pub window_level_steps: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            pick_min_scale: 0.6,
            render_min_scale: 0.1,
            colortable: ColortableId::Grayscale,
            window_level_steps: 15.0,
        }
    }
}

impl RendererConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RendererError;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = RendererConfig::from_json_str(r#"{ "colortable": "heat" }"#).unwrap();
        assert_eq!(config.colortable, ColortableId::Heat);
        assert_eq!(config.pick_min_scale, 0.6);
        assert_eq!(config.render_min_scale, 0.1);
        assert_eq!(config.window_level_steps, 15.0);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let result = RendererConfig::from_json_str("{ pick_min_scale: ");
        assert!(matches!(result, Err(RendererError::Config(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "pick_min_scale": 1.0 }}"#).unwrap();
        let config = RendererConfig::from_path(file.path()).unwrap();
        assert_eq!(config.pick_min_scale, 1.0);
        assert_eq!(config.colortable, ColortableId::Grayscale);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = RendererConfig::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(RendererError::Io(_))));
    }
}

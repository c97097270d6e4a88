// SPDX-License-Identifier: MIT OR Apache-2.0
//! Surface layout metrics used to size nodes around their ports.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layout metrics for node bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceStyle {
    /// Height of one port row
    pub box_row_height: f32,
    /// Height of the title bar
    pub header_height: f32,
    /// Approximate width of one text character
    pub char_width: f32,
    /// Horizontal space taken by a port handle and its margins
    pub box_padding: f32,
    /// Gap kept between the input and output label columns
    pub column_gap: f32,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            box_row_height: 20.0,
            header_height: 20.0,
            char_width: 7.0,
            box_padding: 24.0,
            column_gap: 10.0,
        }
    }
}

impl SurfaceStyle {
    /// Width needed to show `text`
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }

    /// Load style from file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let style = SurfaceStyle::from_ron("(box_row_height: 24.0)").unwrap();
        assert_eq!(style.box_row_height, 24.0);
        assert_eq!(style.char_width, SurfaceStyle::default().char_width);
    }

    #[test]
    fn test_text_width() {
        let style = SurfaceStyle::default();
        assert_eq!(style.text_width("Pack"), 28.0);
        assert_eq!(style.text_width(""), 0.0);
    }
}

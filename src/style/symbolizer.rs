//! Symbolizer structures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Paint/geometry specification attached to a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Symbolizer {
    Point(PointSymbolizer),
    Line(LineSymbolizer),
    Polygon(PolygonSymbolizer),
    Text(TextSymbolizer),
    RasterPalette(RasterPaletteSymbolizer),
    RasterCell(RasterCellSymbolizer),
}

impl Symbolizer {
    pub fn kind(&self) -> SymbolizerKind {
        match self {
            Symbolizer::Point(_) => SymbolizerKind::Point,
            Symbolizer::Line(_) => SymbolizerKind::Line,
            Symbolizer::Polygon(_) => SymbolizerKind::Polygon,
            Symbolizer::Text(_) => SymbolizerKind::Text,
            Symbolizer::RasterPalette(_) => SymbolizerKind::RasterPalette,
            Symbolizer::RasterCell(_) => SymbolizerKind::RasterCell,
        }
    }

    pub fn is_cell(&self) -> bool {
        matches!(self, Symbolizer::RasterCell(_))
    }
}

/// Symbolizer variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolizerKind {
    Point,
    Line,
    Polygon,
    Text,
    RasterPalette,
    RasterCell,
}

impl SymbolizerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolizerKind::Point => "point",
            SymbolizerKind::Line => "line",
            SymbolizerKind::Polygon => "polygon",
            SymbolizerKind::Text => "text",
            SymbolizerKind::RasterPalette => "raster-palette",
            SymbolizerKind::RasterCell => "raster-cell",
        }
    }
}

impl fmt::Display for SymbolizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymbolizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(SymbolizerKind::Point),
            "line" => Ok(SymbolizerKind::Line),
            "polygon" => Ok(SymbolizerKind::Polygon),
            "text" => Ok(SymbolizerKind::Text),
            "raster-palette" => Ok(SymbolizerKind::RasterPalette),
            "raster-cell" => Ok(SymbolizerKind::RasterCell),
            other => Err(format!("Unknown symbolizer kind: {}", other)),
        }
    }
}

/// Point marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointSymbolizer {
    /// Well-known mark name (circle, square, triangle, star, cross, x)
    pub shape: String,
    pub size: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_width: f64,
    pub rotation: f64,
    /// External graphic URL, used instead of `shape` when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphic: Option<String>,
}

impl Default for PointSymbolizer {
    fn default() -> Self {
        Self {
            shape: "circle".to_string(),
            size: 10.0,
            fill_color: "#ee9900".to_string(),
            fill_opacity: 0.4,
            stroke_color: "#ee9900".to_string(),
            stroke_width: 1.0,
            rotation: 0.0,
            graphic: None,
        }
    }
}

/// Line stroke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineSymbolizer {
    pub stroke_color: String,
    pub stroke_width: f64,
    pub stroke_opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_array: Option<Vec<f64>>,
}

impl Default for LineSymbolizer {
    fn default() -> Self {
        Self {
            stroke_color: "#ee9900".to_string(),
            stroke_width: 1.0,
            stroke_opacity: 1.0,
            dash_array: None,
        }
    }
}

/// Polygon fill and outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolygonSymbolizer {
    pub fill_color: String,
    pub fill_opacity: f64,
    pub stroke_color: String,
    pub stroke_width: f64,
}

impl Default for PolygonSymbolizer {
    fn default() -> Self {
        Self {
            fill_color: "#ee9900".to_string(),
            fill_opacity: 0.4,
            stroke_color: "#ee9900".to_string(),
            stroke_width: 1.0,
        }
    }
}

/// Text label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextSymbolizer {
    /// Attribute providing the label text
    pub label: Option<String>,
    pub font_family: String,
    pub font_size: f64,
    pub fill_color: String,
    pub halo_color: String,
    pub halo_radius: f64,
    /// Displacement in pixels (x, y)
    pub offset: [f64; 2],
}

impl Default for TextSymbolizer {
    fn default() -> Self {
        Self {
            label: None,
            font_family: "Arial".to_string(),
            font_size: 12.0,
            fill_color: "#000000".to_string(),
            halo_color: "#ffffff".to_string(),
            halo_radius: 1.0,
            offset: [0.0, 0.0],
        }
    }
}

/// How raster values map onto color map entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMapType {
    #[default]
    Ramp,
    Intervals,
    Values,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorMapEntry {
    pub quantity: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ColorMapEntry {
    pub fn new(quantity: f64, color: impl Into<String>) -> Self {
        Self {
            quantity,
            color: color.into(),
            opacity: None,
            label: None,
        }
    }
}

/// Raster rendered through a color palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RasterPaletteSymbolizer {
    pub color_map_type: ColorMapType,
    pub opacity: f64,
    pub entries: Vec<ColorMapEntry>,
}

impl Default for RasterPaletteSymbolizer {
    fn default() -> Self {
        Self {
            color_map_type: ColorMapType::Ramp,
            opacity: 1.0,
            entries: vec![
                ColorMapEntry::new(0.0, "#000000"),
                ColorMapEntry::new(255.0, "#ffffff"),
            ],
        }
    }
}

/// Raster rendered cell by cell with a marker and a value label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RasterCellSymbolizer {
    /// Cell size in pixels
    pub cell_size: f64,
    pub point: PointSymbolizer,
    pub text: TextSymbolizer,
}

impl Default for RasterCellSymbolizer {
    fn default() -> Self {
        Self {
            cell_size: 16.0,
            point: PointSymbolizer::default(),
            text: TextSymbolizer {
                label: Some("value".to_string()),
                ..TextSymbolizer::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_serialization() {
        let sym = Symbolizer::Polygon(PolygonSymbolizer::default());
        let value = serde_json::to_value(&sym).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "polygon",
                "fillColor": "#ee9900",
                "fillOpacity": 0.4,
                "strokeColor": "#ee9900",
                "strokeWidth": 1.0
            })
        );
    }

    #[test]
    fn test_raster_tags() {
        let palette = serde_json::to_value(Symbolizer::RasterPalette(Default::default())).unwrap();
        assert_eq!(palette["type"], "raster-palette");
        assert_eq!(palette["colorMapType"], "ramp");

        let cell = serde_json::to_value(Symbolizer::RasterCell(Default::default())).unwrap();
        assert_eq!(cell["type"], "raster-cell");
        assert_eq!(cell["text"]["label"], "value");
        assert_eq!(cell["point"]["shape"], "circle");
    }

    #[test]
    fn test_partial_input_uses_defaults() {
        let sym: Symbolizer =
            serde_json::from_value(json!({"type": "line", "strokeWidth": 3})).unwrap();
        match sym {
            Symbolizer::Line(line) => {
                assert_eq!(line.stroke_width, 3.0);
                assert_eq!(line.stroke_color, "#ee9900");
            }
            _ => panic!("Expected line symbolizer"),
        }
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in ["point", "line", "polygon", "text", "raster-palette", "raster-cell"] {
            let parsed: SymbolizerKind = kind.parse().unwrap();
            assert_eq!(parsed.as_str(), kind);
        }
        assert!("raster".parse::<SymbolizerKind>().is_err());
    }
}

//! Default paint values for newly added symbolizers

use serde::Deserialize;

use crate::style::{
    LineSymbolizer, PointSymbolizer, PolygonSymbolizer, RasterCellSymbolizer,
    RasterPaletteSymbolizer, Symbolizer, SymbolizerKind, TextSymbolizer,
};

/// Default palette for automatic classification (5-class YlGnBu)
pub const DEFAULT_PALETTE: [&str; 5] = ["#ffffcc", "#a1dab4", "#41b6c4", "#2c7fb8", "#253494"];

/// One template per symbolizer kind; missing entries fall back to the
/// built-in literal defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SymbolizerDefaults {
    pub point: PointSymbolizer,
    pub line: LineSymbolizer,
    pub polygon: PolygonSymbolizer,
    pub text: TextSymbolizer,
    pub raster_palette: RasterPaletteSymbolizer,
    pub raster_cell: RasterCellSymbolizer,
}

impl SymbolizerDefaults {
    /// Fresh symbolizer of `kind` with default paint values
    pub fn symbolizer(&self, kind: SymbolizerKind) -> Symbolizer {
        match kind {
            SymbolizerKind::Point => Symbolizer::Point(self.point.clone()),
            SymbolizerKind::Line => Symbolizer::Line(self.line.clone()),
            SymbolizerKind::Polygon => Symbolizer::Polygon(self.polygon.clone()),
            SymbolizerKind::Text => Symbolizer::Text(self.text.clone()),
            SymbolizerKind::RasterPalette => {
                Symbolizer::RasterPalette(self.raster_palette.clone())
            }
            SymbolizerKind::RasterCell => Symbolizer::RasterCell(self.raster_cell.clone()),
        }
    }
}

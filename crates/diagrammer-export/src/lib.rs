//! Export formats for diagrammer

pub mod svg;

pub use svg::{SvgSurface, export_frame_svg, export_svg, save_svg};

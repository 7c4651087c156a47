//! Physical size to pixel conversions.
//!
//! Every raster the crate produces has its dimensions derived from a physical
//! size and a DPI value through these functions, so identical inputs always
//! give identical pixel sizes.

/// Print resolution used for every output raster.
pub const DPI: u32 = 300;

/// Inches per centimetre.
pub const INCHES_PER_CM: f64 = 0.393701;

/// Inches per millimetre.
pub const INCHES_PER_MM: f64 = 0.0393701;

/// Standard photo width in centimetres.
pub const PHOTO_WIDTH_CM: f64 = 3.0;

/// Standard photo height in centimetres.
pub const PHOTO_HEIGHT_CM: f64 = 4.0;

/// Standard photo width at [`DPI`] (354 px).
pub const PHOTO_WIDTH_PX: u32 = 354;

/// Standard photo height at [`DPI`] (472 px).
pub const PHOTO_HEIGHT_PX: u32 = 472;

/// Convert a length in centimetres to whole pixels at `dpi`.
pub fn cm_to_px(cm: f64, dpi: u32) -> u32 {
    (cm * INCHES_PER_CM * dpi as f64).round() as u32
}

/// Convert a length in millimetres to whole pixels at `dpi`.
pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm * INCHES_PER_MM * dpi as f64).round() as u32
}

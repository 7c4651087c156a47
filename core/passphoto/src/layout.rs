//! Print sheets: fixed grids of the standardized photo with cut guides.

use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::caption::draw_caption;
use crate::encode::{encode_rgb, EncodedImage, OutputFormat, DEFAULT_QUALITY};
use crate::error::IdPhotoError;
use crate::process::ProcessedPhoto;
use crate::units::{mm_to_px, DPI};

/// Cut guide color (#CCCCCC).
const GUIDE_COLOR: Rgb<u8> = Rgb([0xCC, 0xCC, 0xCC]);

/// Cut guide stroke width in pixels.
const GUIDE_WIDTH: i32 = 2;

const CAPTION_COLOR: Rgb<u8> = Rgb([0x80, 0x80, 0x80]);

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// The fixed output layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetLayout {
    /// The standardized photo on its own.
    Single,

    /// A4 sheet, 6 copies.
    A4,

    /// 10×15 cm photo paper, 9 copies.
    TenByFifteen,
}

/// How the grid is positioned on the sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridMargin {
    /// Fixed top-left margin in millimetres.
    Fixed(f64),

    /// Grid centered on each axis independently.
    Centered,
}

/// Physical description of a layout. All lengths in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetSpec {
    /// Sheet width.
    pub sheet_width_mm: f64,
    /// Sheet height.
    pub sheet_height_mm: f64,
    /// Width of one copy.
    pub photo_width_mm: f64,
    /// Height of one copy.
    pub photo_height_mm: f64,
    /// Copies per row.
    pub columns: u32,
    /// Rows of copies.
    pub rows: u32,
    /// Grid placement.
    pub margin: GridMargin,
    /// Gap between neighbouring copies on both axes.
    pub spacing_mm: f64,
    /// Whether each copy gets a light-gray cut outline.
    pub cut_guides: bool,
    /// Text printed under the grid.
    pub caption: Option<&'static str>,
    /// Distance from the sheet bottom to the caption baseline.
    pub caption_offset_mm: f64,
    /// Font pixel size multiplier.
    pub caption_scale: u32,
}

impl SheetLayout {
    /// All layouts, in the order they are offered.
    pub const ALL: [SheetLayout; 3] = [
        SheetLayout::Single,
        SheetLayout::A4,
        SheetLayout::TenByFifteen,
    ];

    /// Physical description of this layout.
    pub fn spec(&self) -> SheetSpec {
        match self {
            SheetLayout::Single => SheetSpec {
                sheet_width_mm: 30.0,
                sheet_height_mm: 40.0,
                photo_width_mm: 30.0,
                photo_height_mm: 40.0,
                columns: 1,
                rows: 1,
                margin: GridMargin::Fixed(0.0),
                spacing_mm: 0.0,
                cut_guides: false,
                caption: None,
                caption_offset_mm: 0.0,
                caption_scale: 0,
            },
            SheetLayout::A4 => SheetSpec {
                sheet_width_mm: 210.0,
                sheet_height_mm: 297.0,
                photo_width_mm: 30.0,
                photo_height_mm: 40.0,
                columns: 2,
                rows: 3,
                margin: GridMargin::Fixed(20.0),
                spacing_mm: 15.0,
                cut_guides: true,
                caption: Some("A4 - 6 PHOTOS 3X4 CM - CUT ALONG THE GRAY LINES"),
                caption_offset_mm: 10.0,
                caption_scale: 4,
            },
            SheetLayout::TenByFifteen => SheetSpec {
                sheet_width_mm: 100.0,
                sheet_height_mm: 150.0,
                photo_width_mm: 30.0,
                photo_height_mm: 40.0,
                columns: 3,
                rows: 3,
                margin: GridMargin::Centered,
                spacing_mm: 5.0,
                cut_guides: true,
                caption: Some("10X15 - 9 PHOTOS 3X4 CM"),
                caption_offset_mm: 5.0,
                caption_scale: 3,
            },
        }
    }

    /// Name used by [`FromStr`] and [`fmt::Display`].
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetLayout::Single => "single",
            SheetLayout::A4 => "a4",
            SheetLayout::TenByFifteen => "10x15",
        }
    }
}

impl fmt::Display for SheetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SheetLayout {
    type Err = IdPhotoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(SheetLayout::Single),
            "a4" => Ok(SheetLayout::A4),
            "10x15" => Ok(SheetLayout::TenByFifteen),
            other => Err(IdPhotoError::LayoutError(format!(
                "unknown layout '{other}' (expected single, a4 or 10x15)"
            ))),
        }
    }
}

/// Pixel rectangle of one placed copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    /// Left edge on the sheet.
    pub x: u32,
    /// Top edge on the sheet.
    pub y: u32,
    /// Cell width.
    pub width: u32,
    /// Cell height.
    pub height: u32,
}

/// A rendered sheet ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintSheet {
    /// The rendered sheet.
    pub image: RgbImage,
    /// Layout it was rendered for.
    pub layout: SheetLayout,
    /// Placed copies in row-major order.
    pub cells: Vec<CellRect>,
}

impl PrintSheet {
    /// Sheet width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Sheet height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode as JPEG at the default quality (0.95).
    pub fn encode(&self) -> Result<EncodedImage, IdPhotoError> {
        encode_rgb(&self.image, OutputFormat::Jpeg, DEFAULT_QUALITY)
    }

    /// Encode with an explicit format and quality.
    pub fn encode_as(
        &self,
        format: OutputFormat,
        quality: f32,
    ) -> Result<EncodedImage, IdPhotoError> {
        encode_rgb(&self.image, format, quality)
    }
}

/// Place copies of `photo` on the sheet described by `layout`.
///
/// Deterministic: the same photo and layout always give the same pixels.
pub fn layout_grid(
    photo: &ProcessedPhoto,
    layout: SheetLayout,
) -> Result<PrintSheet, IdPhotoError> {
    let spec = layout.spec();
    let source = photo.image();
    if source.width() == 0 || source.height() == 0 {
        return Err(IdPhotoError::LayoutError("source photo is empty".into()));
    }
    if layout == SheetLayout::Single {
        let (width, height) = source.dimensions();
        return Ok(PrintSheet {
            image: source.clone(),
            layout,
            cells: vec![CellRect {
                x: 0,
                y: 0,
                width,
                height,
            }],
        });
    }

    let sheet_w = mm_to_px(spec.sheet_width_mm, DPI);
    let sheet_h = mm_to_px(spec.sheet_height_mm, DPI);
    let cell_w = mm_to_px(spec.photo_width_mm, DPI);
    let cell_h = mm_to_px(spec.photo_height_mm, DPI);
    let spacing = mm_to_px(spec.spacing_mm, DPI);

    let grid_w = spec.columns * cell_w + spec.columns.saturating_sub(1) * spacing;
    let grid_h = spec.rows * cell_h + spec.rows.saturating_sub(1) * spacing;
    let (margin_x, margin_y) = match spec.margin {
        GridMargin::Fixed(mm) => {
            let m = mm_to_px(mm, DPI);
            (m, m)
        }
        GridMargin::Centered => (
            sheet_w.saturating_sub(grid_w) / 2,
            sheet_h.saturating_sub(grid_h) / 2,
        ),
    };
    if margin_x + grid_w > sheet_w || margin_y + grid_h > sheet_h {
        return Err(IdPhotoError::LayoutError(format!(
            "{layout} grid {grid_w}x{grid_h} does not fit a {sheet_w}x{sheet_h} sheet"
        )));
    }

    let copy = if source.dimensions() == (cell_w, cell_h) {
        source.clone()
    } else {
        log::debug!(
            "resizing {}x{} photo to {cell_w}x{cell_h} cell",
            source.width(),
            source.height()
        );
        imageops::resize(source, cell_w, cell_h, FilterType::Lanczos3)
    };

    let mut image = RgbImage::from_pixel(sheet_w, sheet_h, WHITE);
    let mut cells = Vec::with_capacity((spec.columns * spec.rows) as usize);
    for row in 0..spec.rows {
        for col in 0..spec.columns {
            let cell = CellRect {
                x: margin_x + col * (cell_w + spacing),
                y: margin_y + row * (cell_h + spacing),
                width: cell_w,
                height: cell_h,
            };
            imageops::replace(&mut image, &copy, cell.x as i64, cell.y as i64);
            if spec.cut_guides {
                draw_cut_guide(&mut image, &cell);
            }
            cells.push(cell);
        }
    }

    if let Some(text) = spec.caption {
        let offset = mm_to_px(spec.caption_offset_mm, DPI);
        let bottom = sheet_h.saturating_sub(offset);
        draw_caption(&mut image, text, bottom, spec.caption_scale, CAPTION_COLOR);
    }

    log::info!(
        "laid out {} copies on {sheet_w}x{sheet_h} {layout} sheet",
        cells.len()
    );

    Ok(PrintSheet {
        image,
        layout,
        cells,
    })
}

/// Stroke just outside the cell so photo pixels are never covered.
fn draw_cut_guide(image: &mut RgbImage, cell: &CellRect) {
    for inset in 1..=GUIDE_WIDTH {
        let rect = Rect::at(cell.x as i32 - inset, cell.y as i32 - inset)
            .of_size(cell.width + 2 * inset as u32, cell.height + 2 * inset as u32);
        draw_hollow_rect_mut(image, rect, GUIDE_COLOR);
    }
}

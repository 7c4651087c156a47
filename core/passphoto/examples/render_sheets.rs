//! Validate a portrait and render every sheet layout for it.
//!
//! Usage:
//!   cargo run --example render_sheets -- <photo> <detections.json> [output-dir]
//!
//! `detections.json` is the output of any 68-point landmark model, as an array
//! of `{ "box": {x, y, width, height}, "landmarks": [{x, y}, ...] }`. The
//! background is kept as is; the photo is only cropped and recomposed.

use std::path::{Path, PathBuf};

use image::{RgbImage, RgbaImage};
use passphoto::{
    BackgroundRemover, DetectedFace, FaceDetector, ModelError, SheetLayout, Workflow,
};

struct FromFile(Vec<DetectedFace>);

impl FaceDetector for FromFile {
    fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectedFace>, ModelError> {
        Ok(self.0.clone())
    }
}

struct KeepBackground;

impl BackgroundRemover for KeepBackground {
    fn remove_background(&self, image: &RgbaImage) -> Result<RgbaImage, ModelError> {
        Ok(image.clone())
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: render_sheets <photo> <detections.json> [output-dir]");
        std::process::exit(2);
    }

    let photo = std::fs::read(&args[0]).unwrap();
    let detections: Vec<DetectedFace> =
        serde_json::from_slice(&std::fs::read(&args[1]).unwrap()).unwrap();
    let output_dir = args
        .get(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir).unwrap();

    let detector = FromFile(detections);
    let mut workflow = Workflow::new(&detector, &KeepBackground);
    let report = workflow.upload(&photo).unwrap();

    for check in report.checks() {
        let mark = if check.passed { "ok  " } else { "FAIL" };
        println!("{mark} {:<13} {}", check.name.as_str(), check.message);
    }
    if !report.is_valid() {
        eprintln!("photo rejected");
        std::process::exit(1);
    }

    for layout in SheetLayout::ALL {
        let sheet = workflow.sheet(layout).unwrap();
        write_sheet(&output_dir, layout, &sheet.encode().unwrap().data);
        println!(
            "  {layout}: {}x{} with {} cop{}",
            sheet.width(),
            sheet.height(),
            sheet.cells.len(),
            if sheet.cells.len() == 1 { "y" } else { "ies" }
        );
    }
}

fn write_sheet(dir: &Path, layout: SheetLayout, data: &[u8]) {
    let path = dir.join(format!("photo_{layout}.jpg"));
    std::fs::write(&path, data).unwrap();
}

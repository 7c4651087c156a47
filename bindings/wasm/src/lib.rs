use passphoto::{
    DetectedFace, EncodedImage, FaceBox, FaceDetector, IdPhotoError, ModelError, OutputFormat,
    PrintSheet, ProcessedPhoto, Processor, SheetLayout, ValidationThresholds, Validator,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

/// Processing options, passed as a JavaScript object.
///
/// All fields are optional and fall back to the library defaults.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessOptions {
    pub quality: Option<f32>,
    pub sharpen_amount: Option<f32>,
    pub contrast_boost: Option<f32>,
    pub frame_height_factor: Option<f64>,
}

/// Detector that replays the faces the page already found with its own
/// landmark model.
struct HostDetections(Vec<DetectedFace>);

impl FaceDetector for HostDetections {
    fn detect(&self, _image: &image::RgbImage) -> Result<Vec<DetectedFace>, ModelError> {
        Ok(self.0.clone())
    }
}

fn format_to_str(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Jpeg => "jpeg",
        OutputFormat::Png => "png",
    }
}

/// Create a JS `Error` with a `code` property.
fn make_error(code: &str, message: &str) -> JsValue {
    let err = js_sys::Error::new(message);
    let _ = js_sys::Reflect::set(&err, &"code".into(), &JsValue::from_str(code));
    JsValue::from(err)
}

/// Convert an `IdPhotoError` into a JS `Error` with a machine-readable `code` property.
fn to_js_error(e: IdPhotoError) -> JsValue {
    let code = match &e {
        IdPhotoError::DecodeError(_) => "DECODE_ERROR",
        IdPhotoError::ZeroDimensions => "ZERO_DIMENSIONS",
        IdPhotoError::InvalidLandmarks { .. } => "INVALID_LANDMARKS",
        IdPhotoError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
        IdPhotoError::DetectionFailed(_) => "DETECTION_FAILED",
        IdPhotoError::SegmentationFailed(_) => "SEGMENTATION_FAILED",
        IdPhotoError::ProcessingError(_) => "PROCESSING_ERROR",
        IdPhotoError::LayoutError(_) => "LAYOUT_ERROR",
        IdPhotoError::EncodeError(_) => "ENCODE_ERROR",
        IdPhotoError::InvalidQuality(_) => "INVALID_QUALITY",
        IdPhotoError::NotReady(_) => "NOT_READY",
    };
    make_error(code, &e.to_string())
}

fn parse_or_default<T>(value: JsValue, what: &str) -> Result<T, JsValue>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if value.is_undefined() || value.is_null() {
        Ok(T::default())
    } else {
        serde_wasm_bindgen::from_value(value)
            .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid {what}: {e}")))
    }
}

fn apply_options(opts: &ProcessOptions) -> Processor {
    let mut processor = Processor::new();
    if let Some(q) = opts.quality {
        processor = processor.quality(q);
    }
    if let Some(amount) = opts.sharpen_amount {
        processor = processor.sharpen_amount(amount);
    }
    if let Some(boost) = opts.contrast_boost {
        processor = processor.contrast_boost(boost);
    }
    if let Some(factor) = opts.frame_height_factor {
        processor = processor.frame_height_factor(factor);
    }
    processor
}

/// Build a plain JS object from encoded bytes.
fn build_image_object(encoded: &EncodedImage) -> Result<js_sys::Object, JsValue> {
    let obj = js_sys::Object::new();
    let data = js_sys::Uint8Array::from(&encoded.data[..]);
    js_sys::Reflect::set(&obj, &"data".into(), &data)?;
    js_sys::Reflect::set(
        &obj,
        &"format".into(),
        &JsValue::from_str(format_to_str(encoded.format)),
    )?;
    js_sys::Reflect::set(
        &obj,
        &"mimeType".into(),
        &JsValue::from_str(encoded.format.mime_type()),
    )?;
    js_sys::Reflect::set(&obj, &"width".into(), &JsValue::from(encoded.width))?;
    js_sys::Reflect::set(&obj, &"height".into(), &JsValue::from(encoded.height))?;
    Ok(obj)
}

fn build_sheet_object(sheet: &PrintSheet) -> Result<JsValue, JsValue> {
    let encoded = sheet.encode().map_err(to_js_error)?;
    let obj = build_image_object(&encoded)?;
    js_sys::Reflect::set(
        &obj,
        &"layout".into(),
        &JsValue::from_str(sheet.layout.as_str()),
    )?;

    let cells = js_sys::Array::new();
    for cell in &sheet.cells {
        let cell_obj = js_sys::Object::new();
        js_sys::Reflect::set(&cell_obj, &"x".into(), &JsValue::from(cell.x))?;
        js_sys::Reflect::set(&cell_obj, &"y".into(), &JsValue::from(cell.y))?;
        js_sys::Reflect::set(&cell_obj, &"width".into(), &JsValue::from(cell.width))?;
        js_sys::Reflect::set(&cell_obj, &"height".into(), &JsValue::from(cell.height))?;
        cells.push(&cell_obj);
    }
    js_sys::Reflect::set(&obj, &"cells".into(), &cells)?;

    Ok(JsValue::from(obj))
}

/// Check a portrait against the document-photo rules.
///
/// @param input - Raw image bytes (JPEG, PNG, or WebP)
/// @param detections - Array of `{ box, landmarks }` faces found by the page's
///   landmark model, with 68 `{ x, y }` points each
/// @param thresholds - Optional object overriding maxYawDegrees,
///   maxRollDegrees, minEyeAspectRatio, frameMarginPx, minHeadRatio,
///   maxHeadRatio, maxMouthAspectRatio
/// @returns The validation report: `{ checks, isValid, faceData }`, with
///   `checks` keyed by check name in evaluation order
#[wasm_bindgen]
pub fn validate(
    input: Vec<u8>,
    detections: JsValue,
    thresholds: JsValue,
) -> Result<JsValue, JsValue> {
    let faces: Vec<DetectedFace> = serde_wasm_bindgen::from_value(detections)
        .map_err(|e| make_error("INVALID_LANDMARKS", &format!("invalid detections: {e}")))?;
    let thresholds: ValidationThresholds = parse_or_default(thresholds, "thresholds")?;

    let image = passphoto::decode_image(&input).map_err(to_js_error)?;
    let report = Validator::new()
        .thresholds(thresholds)
        .validate(&image, &HostDetections(faces))
        .map_err(to_js_error)?;

    report
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| make_error("ENCODE_ERROR", &format!("failed to convert report: {e}")))
}

/// Cut the 3:4 region around a validated face, ready for background removal.
///
/// Areas past the source edges are transparent, so the result is always PNG.
///
/// @param input - Raw image bytes
/// @param faceBox - The `faceData.box` of a passing report
/// @param options - Optional object with field: frameHeightFactor
#[wasm_bindgen(js_name = "cropFace")]
pub fn crop_face(
    input: Vec<u8>,
    face_box: JsValue,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let face_box: FaceBox = serde_wasm_bindgen::from_value(face_box)
        .map_err(|e| make_error("INVALID_OPTIONS", &format!("invalid face box: {e}")))?;
    let opts: ProcessOptions = parse_or_default(options, "options")?;

    let image = passphoto::decode_image(&input).map_err(to_js_error)?;
    let cropped = apply_options(&opts)
        .crop(&image, &face_box)
        .map_err(to_js_error)?;
    let encoded = passphoto::encode_rgba_png(&cropped).map_err(to_js_error)?;

    Ok(JsValue::from(build_image_object(&encoded)?))
}

/// Turn a background-removed crop into the standard 3×4 cm photo (354×472 px).
///
/// @param segmented - Image bytes with a transparent background (PNG)
/// @param options - Optional object with fields: quality, sharpenAmount,
///   contrastBoost
/// @returns `{ data, format, mimeType, width, height }` JPEG
#[wasm_bindgen(js_name = "finishPhoto")]
pub fn finish_photo(segmented: Vec<u8>, options: JsValue) -> Result<JsValue, JsValue> {
    let opts: ProcessOptions = parse_or_default(options, "options")?;

    let image = passphoto::decode_image(&segmented).map_err(to_js_error)?;
    let photo = apply_options(&opts)
        .finish(&image.to_rgba8())
        .map_err(to_js_error)?;
    let encoded = photo.encode().map_err(to_js_error)?;

    Ok(JsValue::from(build_image_object(&encoded)?))
}

/// Lay out copies of a standard photo on a print sheet.
///
/// @param photo - Bytes of the photo returned by `finishPhoto`
/// @param layout - "single", "a4" or "10x15"
/// @returns `{ data, format, mimeType, width, height, layout, cells }` JPEG
#[wasm_bindgen(js_name = "layoutSheet")]
pub fn layout_sheet(photo: Vec<u8>, layout: &str) -> Result<JsValue, JsValue> {
    let layout: SheetLayout = layout.parse().map_err(to_js_error)?;
    let image = passphoto::decode_image(&photo).map_err(to_js_error)?;
    let photo = ProcessedPhoto::from_image(image.to_rgb8()).map_err(to_js_error)?;
    let sheet = passphoto::layout_grid(&photo, layout).map_err(to_js_error)?;

    build_sheet_object(&sheet)
}

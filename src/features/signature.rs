use crate::error::{Error, Result};
use crate::features::storage::{KeyValueStore, SIGNATURE_KEY};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CANVAS_WIDTH: u32 = 400;
pub const CANVAS_HEIGHT: u32 = 150;
const STROKE_WIDTH: f32 = 1.0;
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    #[default]
    Upload,
    Draw,
}

impl InputMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "upload" => Some(InputMode::Upload),
            "draw" => Some(InputMode::Draw),
            _ => None,
        }
    }
}

/// Freehand drawing surface. Coordinates are canvas-local pixels.
#[derive(Debug, Clone)]
pub struct SignatureCanvas {
    raster: RgbaImage,
    cursor: Option<(f32, f32)>,
}

impl Default for SignatureCanvas {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

impl SignatureCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            raster: RgbaImage::new(width, height),
            cursor: None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.raster.pixels().all(|p| p[3] == 0)
    }

    /// Starts a new path. Nothing is painted until the pointer moves.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.cursor = Some((x, y));
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        let Some(from) = self.cursor else {
            return;
        };
        self.stroke_segment(from, (x, y));
        self.cursor = Some((x, y));
    }

    /// Pointer up and pointer leave both end the stroke.
    pub fn pointer_up(&mut self) {
        self.cursor = None;
    }

    pub fn clear(&mut self) {
        for pixel in self.raster.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(
            self.raster.as_raw(),
            self.raster.width(),
            self.raster.height(),
            ColorType::Rgba8,
        )?;
        Ok(out)
    }

    pub fn to_data_uri(&self) -> Result<String> {
        Ok(encode_data_uri("image/png", &self.to_png()?))
    }

    fn stroke_segment(&mut self, from: (f32, f32), to: (f32, f32)) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.hypot(dy).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(from.0 + dx * t, from.1 + dy * t);
        }
    }

    fn stamp(&mut self, cx: f32, cy: f32) {
        let r = STROKE_WIDTH / 2.0 + 0.5;
        let (w, h) = (self.raster.width() as i64, self.raster.height() as i64);
        let x0 = (cx - r).floor() as i64;
        let x1 = (cx + r).ceil() as i64;
        let y0 = (cy - r).floor() as i64;
        let y1 = (cy + r).ceil() as i64;
        for py in y0.max(0)..=y1.min(h - 1) {
            for px in x0.max(0)..=x1.min(w - 1) {
                let ddx = px as f32 + 0.5 - cx;
                let ddy = py as f32 + 0.5 - cy;
                if ddx * ddx + ddy * ddy <= r * r {
                    self.raster.put_pixel(px as u32, py as u32, INK);
                }
            }
        }
    }
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", B64.encode(bytes))
}

/// Splits a base64 data-URI into its MIME type and payload.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::DataUri("missing_scheme".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::DataUri("missing_payload".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| Error::DataUri("not_base64".into()))?;
    Ok((mime.to_string(), B64.decode(payload.trim())?))
}

/// Reads an uploaded file and returns its data-URI, rejecting anything the
/// compositor could not embed.
pub fn image_data_uri_from_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    image_data_uri_from_bytes(&bytes)
}

pub fn image_data_uri_from_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(Error::MissingInput("signature_file"));
    }
    let mime = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| mime.starts_with("image/"))
        .ok_or_else(|| Error::DataUri("not_an_image".into()))?;
    image::load_from_memory(bytes)?;
    Ok(encode_data_uri(mime, bytes))
}

pub fn load_signature(store: &dyn KeyValueStore) -> Option<String> {
    store.get(SIGNATURE_KEY).filter(|s| !s.is_empty())
}

pub fn store_signature(store: &mut dyn KeyValueStore, data_uri: String) -> Result<()> {
    store.set(SIGNATURE_KEY, data_uri)
}

pub fn clear_signature(store: &mut dyn KeyValueStore) -> Result<()> {
    store.remove(SIGNATURE_KEY)
}

/// Image bytes for compositing: the captured signature when there is one,
/// otherwise the default asset on disk.
pub fn resolve_signature_bytes(stored: Option<&str>, default_asset: &Path) -> Result<Vec<u8>> {
    if let Some(uri) = stored {
        let (_, bytes) = decode_data_uri(uri)?;
        return Ok(bytes);
    }
    log::warn!(
        "no captured signature, using default asset {}",
        default_asset.display()
    );
    match std::fs::read(default_asset) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::MissingInput("signature"))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

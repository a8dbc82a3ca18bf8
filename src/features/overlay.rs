//! Signature overlay: capture, placement and the signing flow for one document.

use chrono::Local;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::features::dashboard::{append_signed_file, SignedFile};
use crate::features::pdf::{compose_signed_pdf, signed_file_name, write_download, Attestation};
use crate::features::placement::Placement;
use crate::features::signature::{
    clear_signature, image_data_uri_from_file, load_signature, resolve_signature_bytes,
    store_signature, InputMode, SignatureCanvas, CANVAS_HEIGHT, CANVAS_WIDTH,
};
use crate::features::storage::{file_url, parse_file_uri_path};
use crate::ui::{
    Button as UiButton, Column as UiColumn, FilePicker as UiFilePicker,
    PdfViewer as UiPdfViewer, Text as UiText,
};
use crate::App;

const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone)]
pub struct OverlayState {
    pub pdf_url: String,
    pub mode: InputMode,
    pub canvas: SignatureCanvas,
    pub ready: bool,
    pub placement: Placement,
    /// Copy of the stored signature for the draggable preview.
    pub preview: Option<String>,
    /// Set by a successful signing and rendered once as an auto download.
    pub pending_download: Option<SignedFile>,
}

impl OverlayState {
    pub fn new(pdf_url: String) -> Self {
        Self {
            pdf_url,
            mode: InputMode::default(),
            canvas: SignatureCanvas::default(),
            ready: false,
            placement: Placement::default(),
            preview: None,
            pending_download: None,
        }
    }
}

/// Opening always starts from an empty signature slot.
pub fn open_overlay(app: &mut App, pdf_url: Option<&str>) {
    let Some(url) = pdf_url.filter(|u| !u.trim().is_empty()) else {
        app.state.alert("No document selected");
        return;
    };
    if let Err(e) = clear_signature(app.store.as_mut()) {
        log::error!("could not clear stored signature: {e}");
    }
    app.state.overlay = Some(OverlayState::new(url.to_string()));
}

pub fn close_overlay(app: &mut App) {
    app.state.overlay = None;
}

fn overlay_mut(app: &mut App) -> Option<&mut OverlayState> {
    app.state.overlay.as_mut()
}

pub fn set_mode(app: &mut App, mode: InputMode) {
    if let Some(overlay) = overlay_mut(app) {
        overlay.mode = mode;
    }
}

pub fn pointer_down(app: &mut App, x: f32, y: f32) {
    if let Some(overlay) = overlay_mut(app) {
        overlay.canvas.pointer_down(x, y);
    }
}

pub fn pointer_move(app: &mut App, x: f32, y: f32) {
    if let Some(overlay) = overlay_mut(app) {
        overlay.canvas.pointer_move(x, y);
    }
}

pub fn pointer_up(app: &mut App) {
    if let Some(overlay) = overlay_mut(app) {
        overlay.canvas.pointer_up();
    }
}

pub fn clear_canvas(app: &mut App) {
    if let Some(overlay) = overlay_mut(app) {
        overlay.canvas.clear();
    }
}

pub fn drag_end(app: &mut App, dx: Option<f64>, dy: Option<f64>) {
    let (Some(dx), Some(dy)) = (dx, dy) else {
        return;
    };
    if let Some(overlay) = overlay_mut(app) {
        overlay.placement.apply_drag(dx, dy);
    }
}

fn commit_signature(app: &mut App, data_uri: String) -> Result<()> {
    store_signature(app.store.as_mut(), data_uri.clone())?;
    if let Some(overlay) = overlay_mut(app) {
        overlay.ready = true;
        overlay.preview = Some(data_uri);
    }
    Ok(())
}

pub fn save_drawn(app: &mut App) {
    let Some(overlay) = app.state.overlay.as_ref() else {
        return;
    };
    let encoded = overlay.canvas.to_data_uri();
    let result = encoded.and_then(|uri| commit_signature(app, uri));
    match result {
        Ok(()) => app.state.alert("🖋 Signature saved!"),
        Err(e) => {
            log::error!("saving drawn signature failed: {e}");
            app.state.alert("Could not save signature");
        }
    }
}

pub fn upload_signature(app: &mut App, path: Option<&str>) {
    let Some(raw) = path.filter(|p| !p.trim().is_empty()) else {
        return;
    };
    let path = parse_file_uri_path(raw).unwrap_or_else(|| raw.into());
    let result = image_data_uri_from_file(&path).and_then(|uri| commit_signature(app, uri));
    match result {
        Ok(()) => app.state.alert("📁 Signature image saved!"),
        Err(e) => {
            log::error!("signature upload failed for {}: {e}", path.display());
            app.state.alert("Please choose a valid image file");
        }
    }
}

pub fn reset_signature(app: &mut App) {
    if let Err(e) = clear_signature(app.store.as_mut()) {
        log::error!("could not clear stored signature: {e}");
    }
    if let Some(overlay) = overlay_mut(app) {
        overlay.ready = false;
        overlay.preview = None;
    }
    app.state.alert("🗑 Signature reset. You can now upload or draw again.");
}

/// Fetch, composite, download, record. Nothing is written unless every
/// step succeeds.
pub fn sign_document(app: &mut App) -> Result<SignedFile> {
    let overlay = app
        .state
        .overlay
        .as_ref()
        .ok_or(Error::MissingInput("document"))?;
    let placement = overlay.placement;
    let pdf_bytes = app.remote.fetch_bytes(&overlay.pdf_url)?;

    let stored = load_signature(app.store.as_ref());
    let signature = resolve_signature_bytes(stored.as_deref(), &app.config.default_signature_path)?;

    let session = app.state.session.as_ref();
    let now = Local::now();
    let attestation = Attestation::new(session.map(|s| s.name.as_str()), now.naive_local());
    let signed = compose_signed_pdf(&pdf_bytes, &signature, placement, &attestation)?;

    let name = signed_file_name(now.timestamp_millis());
    let path = write_download(&app.config.download_dir, &name, &signed)?;
    let record = SignedFile {
        name,
        url: file_url(&path),
    };
    let email = session
        .map(|s| s.email.clone())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string());
    match append_signed_file(app.store.as_mut(), &email, record.clone()) {
        Ok(files) => app.state.dashboard.signed_files = files,
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&path) {
                log::warn!("could not remove {} after failed record: {cleanup}", path.display());
            }
            return Err(e);
        }
    }
    Ok(record)
}

pub fn handle_download_signed(app: &mut App) {
    match sign_document(app) {
        Ok(record) => {
            log::info!("signed document written to {}", record.url);
            if let Some(overlay) = overlay_mut(app) {
                overlay.pending_download = Some(record);
            }
        }
        Err(e) => {
            log::error!("Error signing PDF: {e}");
            app.state.alert("Failed to sign and download PDF");
        }
    }
}

pub fn render_overlay(overlay: &OverlayState) -> Value {
    let mut children = vec![
        serde_json::to_value(UiButton::new("✕", "overlay_close").id("overlay_close")).unwrap(),
        serde_json::to_value(UiText::new("🖋 Add Your Signature").size(20.0).bold()).unwrap(),
        serde_json::to_value(UiColumn::new(vec![
            serde_json::to_value(
                UiButton::new("Upload Image", "signature_mode")
                    .selected(overlay.mode == InputMode::Upload)
                    .payload(json!({ "mode": "upload" })),
            )
            .unwrap(),
            serde_json::to_value(
                UiButton::new("Draw Signature", "signature_mode")
                    .selected(overlay.mode == InputMode::Draw)
                    .payload(json!({ "mode": "draw" })),
            )
            .unwrap(),
            serde_json::to_value(UiButton::new("Reset Signature", "signature_reset")).unwrap(),
        ]))
        .unwrap(),
    ];

    match overlay.mode {
        InputMode::Upload => children.push(
            serde_json::to_value(UiFilePicker::new("signature_upload", "image/*")).unwrap(),
        ),
        InputMode::Draw => {
            children.push(json!({
                "type": "SignaturePad",
                "width": CANVAS_WIDTH,
                "height": CANVAS_HEIGHT,
                "pointer_down": "signature_pointer_down",
                "pointer_move": "signature_pointer_move",
                "pointer_up": "signature_pointer_up",
                "pointer_leave": "signature_pointer_up",
                "content_description": "Signature drawing area"
            }));
            children.push(serde_json::to_value(UiButton::new("Save Signature", "signature_save")).unwrap());
            children.push(serde_json::to_value(UiButton::new("Clear", "signature_clear")).unwrap());
        }
    }

    let mut drop_zone = vec![serde_json::to_value(UiPdfViewer::new(&overlay.pdf_url).height(600)).unwrap()];
    if let (true, Some(src)) = (overlay.ready, overlay.preview.as_deref()) {
        drop_zone.push(json!({
            "type": "Draggable",
            "id": "signature-image",
            "src": src,
            "top": overlay.placement.y,
            "left": overlay.placement.x,
            "width": 150,
            "drag_end": "signature_drag_end"
        }));
    }
    children.push(json!({
        "type": "DropZone",
        "id": "pdf-zone",
        "children": drop_zone
    }));

    children.push(
        serde_json::to_value(UiButton::new("Download Signed PDF", "signature_download").id("download_signed"))
            .unwrap(),
    );
    if let Some(done) = &overlay.pending_download {
        children.push(json!({
            "type": "Download",
            "text": done.name,
            "url": done.url,
            "auto": true
        }));
    }

    json!({
        "type": "Overlay",
        "children": children
    })
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::features::api::Document;
use crate::features::overlay::render_overlay;
use crate::features::pages::{page, section};
use crate::features::storage::{get_json, parse_file_uri_path, set_json, signed_files_key, KeyValueStore};
use crate::state::{AppState, Screen};
use crate::ui::{
    Button as UiButton, Card as UiCard, Column as UiColumn, FilePicker as UiFilePicker,
    Grid as UiGrid, Link as UiLink, PdfViewer as UiPdfViewer, Text as UiText,
};
use crate::App;

/// Local record of a file produced by signing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignedFile {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEntry {
    pub document: Document,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub documents: Vec<DocumentEntry>,
    pub selected_file: Option<PathBuf>,
    pub signed_files: Vec<SignedFile>,
}

impl DashboardState {
    pub const fn new() -> Self {
        Self {
            documents: Vec::new(),
            selected_file: None,
            signed_files: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.documents.clear();
        self.selected_file = None;
        self.signed_files.clear();
    }
}

pub fn load_signed_files(store: &dyn KeyValueStore, email: &str) -> Vec<SignedFile> {
    get_json(store, &signed_files_key(email)).unwrap_or_default()
}

pub fn append_signed_file(
    store: &mut dyn KeyValueStore,
    email: &str,
    record: SignedFile,
) -> Result<Vec<SignedFile>> {
    let mut files = load_signed_files(store, email);
    files.push(record);
    set_json(store, &signed_files_key(email), &files)?;
    Ok(files)
}

/// Navigates to the dashboard, bouncing to Login without a session.
pub fn open_dashboard(app: &mut App) {
    let Some(session) = app.state.session.clone() else {
        app.state.alert("Please log in first");
        app.state.push_screen(Screen::Login);
        return;
    };
    app.state.push_screen(Screen::Dashboard);
    app.state.dashboard.signed_files = load_signed_files(app.store.as_ref(), &session.email);
    match app.remote.list_documents(&session.token) {
        Ok(documents) => {
            app.state.dashboard.documents = documents
                .into_iter()
                .map(|document| DocumentEntry {
                    url: app.remote.document_url(&document.path),
                    document,
                })
                .collect();
        }
        Err(e) => log::error!("Failed to load files: {e}"),
    }
}

pub fn handle_file_selected(state: &mut AppState, path: Option<&str>) {
    state.dashboard.selected_file = path
        .filter(|p| !p.trim().is_empty())
        .map(|p| parse_file_uri_path(p).unwrap_or_else(|| PathBuf::from(p)));
}

fn read_upload(path: &Path) -> Result<(String, Vec<u8>)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or(Error::MissingInput("file_name"))?;
    Ok((name, std::fs::read(path)?))
}

pub fn handle_upload(app: &mut App) {
    let Some(path) = app.state.dashboard.selected_file.clone() else {
        app.state.alert("Select a PDF first");
        return;
    };
    let Some(token) = app.state.session.as_ref().map(|s| s.token.clone()) else {
        app.state.alert("Please log in first");
        return;
    };

    let result = read_upload(&path)
        .and_then(|(name, bytes)| app.remote.upload_document(&token, &name, bytes));
    match result {
        Ok(document) => {
            log::info!("uploaded {}", document.display_name());
            let url = app.remote.document_url(&document.path);
            app.state.dashboard.documents.push(DocumentEntry { document, url });
            app.state.dashboard.selected_file = None;
            app.state.alert("Uploaded successfully!");
        }
        Err(e) if e.is_status() => {
            log::warn!("upload rejected: {e}");
            let message = e.server_message().unwrap_or("Upload failed").to_string();
            app.state.alert(message);
        }
        Err(e) => {
            log::error!("Upload error: {e}");
            app.state.alert("Upload error");
        }
    }
}

fn render_document_card(index: usize, entry: &DocumentEntry) -> Value {
    let id = format!("sign_doc_{index}");
    serde_json::to_value(
        UiCard::new(vec![
            serde_json::to_value(UiText::new(entry.document.display_name()).size(14.0)).unwrap(),
            serde_json::to_value(UiPdfViewer::new(&entry.url)).unwrap(),
            serde_json::to_value(
                UiButton::new("Add Signature", "overlay_open")
                    .id(&id)
                    .payload(json!({ "path": entry.url })),
            )
            .unwrap(),
        ])
        .padding(12),
    )
    .unwrap()
}

pub fn render_dashboard_screen(state: &AppState) -> Value {
    let name = state
        .session
        .as_ref()
        .map(|s| s.name.as_str())
        .unwrap_or_default();
    let welcome = format!("Welcome, {name} 👋");
    let selected = state
        .dashboard
        .selected_file
        .as_deref()
        .and_then(|p| p.to_str());

    let body = vec![
        serde_json::to_value(UiText::new("📂 Dashboard").size(26.0).bold()).unwrap(),
        serde_json::to_value(UiText::new(&welcome).size(14.0)).unwrap(),
        serde_json::to_value(UiButton::new("Logout", "logout").id("logout_btn")).unwrap(),
        section(vec![
            serde_json::to_value(UiText::new("Upload PDF:").bold()).unwrap(),
            serde_json::to_value(
                UiFilePicker::new("dashboard_file_selected", "application/pdf").selected(selected),
            )
            .unwrap(),
            serde_json::to_value(UiButton::new("Upload PDF", "dashboard_upload").id("upload_btn"))
                .unwrap(),
        ]),
    ];

    let cards: Vec<Value> = state
        .dashboard
        .documents
        .iter()
        .enumerate()
        .map(|(i, entry)| render_document_card(i, entry))
        .collect();

    let mut children = body;
    children.push(
        serde_json::to_value(
            UiGrid::new(cards)
                .columns(3)
                .content_description("uploaded_documents"),
        )
        .unwrap(),
    );

    if !state.dashboard.signed_files.is_empty() {
        let links: Vec<Value> = state
            .dashboard
            .signed_files
            .iter()
            .map(|f| {
                json!({
                    "type": "Download",
                    "text": f.name,
                    "url": f.url,
                })
            })
            .collect();
        children.push(section(vec![
            serde_json::to_value(UiText::new("Signed files").bold()).unwrap(),
            serde_json::to_value(UiColumn::new(links).content_description("signed_files")).unwrap(),
        ]));
    }

    if let Some(overlay) = &state.overlay {
        children.push(render_overlay(overlay));
    } else if state.session.is_none() {
        children.push(serde_json::to_value(UiLink::new("Login", "login_screen")).unwrap());
    }

    page(state, children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::storage::MemoryStore;

    #[test]
    fn signed_files_are_appended_per_user() {
        let mut store = MemoryStore::new();
        let rec = |n: &str| SignedFile {
            name: n.into(),
            url: format!("file:///tmp/{n}"),
        };
        append_signed_file(&mut store, "a@x", rec("one.pdf")).unwrap();
        let files = append_signed_file(&mut store, "a@x", rec("two.pdf")).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(load_signed_files(&store, "a@x")[1].name, "two.pdf");
        assert!(load_signed_files(&store, "b@x").is_empty());
    }

    #[test]
    fn file_selection_accepts_uris_and_clears_on_blank() {
        let mut state = AppState::new();
        handle_file_selected(&mut state, Some("file:///tmp/a.pdf"));
        assert_eq!(state.dashboard.selected_file, Some(PathBuf::from("/tmp/a.pdf")));
        handle_file_selected(&mut state, Some("  "));
        assert_eq!(state.dashboard.selected_file, None);
    }
}

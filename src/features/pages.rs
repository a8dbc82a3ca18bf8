//! Page chrome and the static pages.

use crate::state::AppState;
use crate::ui::{
    Alert as UiAlert, Button as UiButton, Card as UiCard, Column as UiColumn, Link as UiLink,
    Text as UiText,
};
use chrono::Datelike;
use serde_json::{json, Value};

pub const APP_NAME: &str = "Snap Sign";

const NAV_LINKS: [(&str, &str); 4] = [
    ("Login", "login_screen"),
    ("Register", "register_screen"),
    ("Dashboard", "dashboard_screen"),
    ("About", "about"),
];

pub fn render_navbar() -> Value {
    let links: Vec<Value> = NAV_LINKS
        .iter()
        .map(|(label, action)| serde_json::to_value(UiLink::new(label, action)).unwrap())
        .collect();
    json!({
        "type": "Navbar",
        "title": APP_NAME,
        "title_action": "home",
        "links": links,
    })
}

pub fn footer_text(year: i32) -> String {
    format!("© {year} {APP_NAME}. All rights reserved.")
}

pub fn render_footer() -> Value {
    let text = footer_text(chrono::Local::now().year());
    json!({
        "type": "Footer",
        "children": [serde_json::to_value(UiText::new(&text).size(12.0)).unwrap()],
    })
}

pub fn section(children: Vec<Value>) -> Value {
    serde_json::to_value(UiCard::new(children).padding(16)).unwrap()
}

/// Navbar, body, footer, then any pending alert.
pub fn page(state: &AppState, body: Vec<Value>) -> Value {
    let mut children = Vec::with_capacity(body.len() + 4);
    children.push(render_navbar());
    children.extend(body);
    maybe_push_back(&mut children, state);
    children.push(render_footer());
    if let Some(alert) = &state.alert {
        children.push(serde_json::to_value(UiAlert::new(alert)).unwrap());
    }
    serde_json::to_value(UiColumn::new(children)).unwrap()
}

fn maybe_push_back(children: &mut Vec<Value>, state: &AppState) {
    if state.nav_depth() > 1 {
        children.push(serde_json::to_value(UiButton::new("Back", "back")).unwrap());
    }
}

pub fn render_home_screen(state: &AppState) -> Value {
    let hero = vec![
        serde_json::to_value(
            UiText::new("✍ Digitally Sign Your PDFs with Ease")
                .size(28.0)
                .bold(),
        )
        .unwrap(),
        serde_json::to_value(
            UiText::new(
                "Welcome to Snap Sign — a fast, secure and eco-friendly way to sign documents online. Say goodbye to printers and scanners!",
            )
            .size(16.0),
        )
        .unwrap(),
        serde_json::to_value(UiButton::new("Get Started", "register_screen").id("get_started"))
            .unwrap(),
    ];
    page(state, vec![section(hero)])
}

const ABOUT_FEATURES: [&str; 5] = [
    "📄 Upload and view PDFs instantly.",
    "🖋 Add your signature using an image or draw directly with your mouse.",
    "🔐 Keep documents private — only you can access and sign them.",
    "🚀 Save signed files and download them instantly.",
    "🧑‍💼 Ideal for students, professionals, and remote teams.",
];

pub fn render_about_screen(state: &AppState) -> Value {
    let mut body = vec![
        serde_json::to_value(UiText::new("About Snap Sign").size(24.0).bold()).unwrap(),
        serde_json::to_value(
            UiText::new(
                "Snap Sign is a secure, user-friendly platform designed to help you digitally sign PDF documents with just a few clicks — no printer, scanner, or pen required!",
            )
            .size(14.0),
        )
        .unwrap(),
    ];
    let bullets: Vec<Value> = ABOUT_FEATURES
        .iter()
        .map(|item| serde_json::to_value(UiText::new(item).size(14.0)).unwrap())
        .collect();
    body.push(
        serde_json::to_value(UiColumn::new(bullets).content_description("about_features")).unwrap(),
    );
    body.push(
        serde_json::to_value(
            UiText::new(
                "Built for the modern digital world, Snap Sign is your trusted tool for fast, paperless, and secure document signing.",
            )
            .size(14.0),
        )
        .unwrap(),
    );
    body.push(
        serde_json::to_value(
            UiText::new(&format!("Version: {}", env!("CARGO_PKG_VERSION"))).size(12.0),
        )
        .unwrap(),
    );
    page(state, vec![section(body)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Screen;

    #[test]
    fn footer_carries_year() {
        assert_eq!(footer_text(2025), "© 2025 Snap Sign. All rights reserved.");
    }

    #[test]
    fn navbar_links_in_order() {
        let nav = render_navbar();
        let actions: Vec<&str> = nav["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["action"].as_str().unwrap())
            .collect();
        assert_eq!(
            actions,
            ["login_screen", "register_screen", "dashboard_screen", "about"]
        );
    }

    #[test]
    fn page_appends_alert_last() {
        let mut state = AppState::new();
        state.push_screen(Screen::About);
        state.alert("hello");
        let ui = page(&state, vec![]);
        let children = ui["children"].as_array().unwrap();
        assert_eq!(children[0]["type"], "Navbar");
        assert_eq!(children.last().unwrap()["type"], "Alert");
        assert!(children.iter().any(|c| c["action"] == "back"));
    }
}

use crate::error::{Error, Result};
use crate::features::api::LoginResponse;
use crate::features::dashboard;
use crate::features::pages::{page, section};
use crate::features::storage::{get_json, set_json, KeyValueStore, SESSION_KEY};
use crate::state::{AppState, Screen};
use crate::ui::{Button as UiButton, Link as UiLink, Text as UiText, TextInput as UiTextInput};
use crate::App;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The cached identity of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub token: String,
}

pub fn save_session(store: &mut dyn KeyValueStore, session: &Session) -> Result<()> {
    set_json(store, SESSION_KEY, session)
}

/// A stored record without a token reads as logged out.
pub fn load_session(store: &dyn KeyValueStore) -> Option<Session> {
    get_json::<Session>(store, SESSION_KEY).filter(|s| !s.token.is_empty())
}

pub fn clear_session(store: &mut dyn KeyValueStore) -> Result<()> {
    store.remove(SESSION_KEY)
}

#[derive(Debug, Default, Clone)]
pub struct Credentials {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingInput(field))
}

fn session_from_login(reply: LoginResponse, email: &str) -> Option<Session> {
    let token = reply.token.filter(|t| !t.is_empty())?;
    let (name, email) = match reply.user {
        Some(user) => (user.name, user.email),
        None => (String::new(), email.to_string()),
    };
    Some(Session { name, email, token })
}

pub fn handle_login(app: &mut App, creds: &Credentials) {
    let (email, password) = match (required(&creds.email, "email"), required(&creds.password, "password")) {
        (Ok(e), Ok(p)) => (e.to_string(), p.to_string()),
        _ => {
            app.state.alert("Email and password are required.");
            return;
        }
    };

    let reply = match app.remote.login(&email, &password) {
        Ok(reply) => reply,
        Err(e) if e.is_status() => {
            log::warn!("login rejected: {e}");
            let message = e.server_message().unwrap_or("Login failed").to_string();
            app.state.alert(message);
            return;
        }
        Err(e) => {
            log::error!("login error: {e}");
            app.state.alert("Something went wrong during login.");
            return;
        }
    };

    let message = reply.message.clone();
    let Some(session) = session_from_login(reply, &email) else {
        app.state.alert(message.unwrap_or_else(|| "Login failed".into()));
        return;
    };
    if let Err(e) = save_session(app.store.as_mut(), &session) {
        log::error!("login error: {e}");
        app.state.alert("Something went wrong during login.");
        return;
    }
    log::info!("signed in as {}", session.email);
    app.state.session = Some(session);
    dashboard::open_dashboard(app);
    app.state.alert("Login successful!");
}

pub fn handle_register(app: &mut App, creds: &Credentials) {
    let name = creds.name.as_deref().map(str::trim).unwrap_or_default().to_string();
    let email = creds.email.as_deref().map(str::trim).unwrap_or_default().to_string();
    let password = creds.password.clone().unwrap_or_default();

    match app.remote.register(&name, &email, &password) {
        Ok(()) => {
            app.state.replace_current(Screen::Login);
            app.state.alert("Registration successful! Please login.");
        }
        Err(e) if e.is_status() => {
            log::warn!("registration rejected: {e}");
            let message = e.server_message().unwrap_or("Registration failed").to_string();
            app.state.alert(message);
        }
        Err(e) => {
            log::error!("registration error: {e}");
            app.state.alert("Something went wrong. Please try again.");
        }
    }
}

pub fn handle_logout(app: &mut App) {
    if let Err(e) = clear_session(app.store.as_mut()) {
        log::error!("logout failed to clear session: {e}");
    }
    app.state.reset_runtime();
    app.state.reset_navigation();
    app.state.push_screen(Screen::Login);
}

pub fn render_login_screen(state: &AppState) -> Value {
    let form = vec![
        serde_json::to_value(UiText::new("Login").size(24.0).bold()).unwrap(),
        serde_json::to_value(
            UiTextInput::new("email")
                .hint("Email")
                .input_type("email")
                .required(true),
        )
        .unwrap(),
        serde_json::to_value(
            UiTextInput::new("password")
                .hint("Password")
                .input_type("password")
                .required(true),
        )
        .unwrap(),
        serde_json::to_value(UiButton::new("Login", "login_submit").id("login_btn")).unwrap(),
        serde_json::to_value(UiText::new("Don't have an account?").size(12.0)).unwrap(),
        serde_json::to_value(UiLink::new("Register", "register_screen")).unwrap(),
    ];
    page(state, vec![section(form)])
}

pub fn render_register_screen(state: &AppState) -> Value {
    let form = vec![
        serde_json::to_value(UiText::new("Register").size(24.0).bold()).unwrap(),
        serde_json::to_value(UiTextInput::new("name").hint("Name").input_type("text")).unwrap(),
        serde_json::to_value(UiTextInput::new("email").hint("Email").input_type("email")).unwrap(),
        serde_json::to_value(
            UiTextInput::new("password")
                .hint("Password")
                .input_type("password"),
        )
        .unwrap(),
        serde_json::to_value(UiButton::new("Register", "register_submit").id("register_btn"))
            .unwrap(),
        serde_json::to_value(UiText::new("Already have an account?").size(12.0)).unwrap(),
        serde_json::to_value(UiLink::new("Login", "login_screen")).unwrap(),
    ];
    page(state, vec![section(form)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::api::UserInfo;
    use crate::features::storage::MemoryStore;

    fn sample() -> Session {
        Session {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            token: "t0k".into(),
        }
    }

    #[test]
    fn session_round_trip_and_logout() {
        let mut store = MemoryStore::new();
        save_session(&mut store, &sample()).unwrap();
        assert_eq!(load_session(&store), Some(sample()));
        clear_session(&mut store).unwrap();
        assert_eq!(load_session(&store), None);
    }

    #[test]
    fn stored_session_uses_flat_shape() {
        let mut store = MemoryStore::new();
        save_session(&mut store, &sample()).unwrap();
        let raw: Value = serde_json::from_str(&store.get(SESSION_KEY).unwrap()).unwrap();
        assert_eq!(raw["name"], "Ada");
        assert_eq!(raw["token"], "t0k");
    }

    #[test]
    fn tokenless_record_reads_as_absent() {
        let mut store = MemoryStore::new();
        store
            .set(SESSION_KEY, r#"{"name":"Ada","email":"a@b","token":""}"#.into())
            .unwrap();
        assert_eq!(load_session(&store), None);
    }

    #[test]
    fn login_reply_needs_token() {
        assert_eq!(session_from_login(LoginResponse::default(), "a@b"), None);
        let reply = LoginResponse {
            token: Some("tok".into()),
            user: Some(UserInfo {
                name: "Ada".into(),
                email: "ada@example.com".into(),
            }),
            message: None,
        };
        let session = session_from_login(reply, "typed@example.com").unwrap();
        assert_eq!(session.email, "ada@example.com");
        assert_eq!(session.name, "Ada");
    }
}

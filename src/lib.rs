pub mod config;
pub mod error;
pub mod features;
mod state;
mod ui;

use features::api::{HttpRemote, Remote};
use features::auth::{
    handle_login, handle_logout, handle_register, load_session, render_login_screen,
    render_register_screen, Credentials,
};
use features::dashboard::{handle_file_selected, handle_upload, open_dashboard, render_dashboard_screen};
use features::overlay;
use features::pages::{render_about_screen, render_home_screen};
use features::signature::InputMode;
use features::storage::{FileStore, KeyValueStore};

use config::Config;
use serde::Deserialize;
use serde_json::{json, Value};
use state::{AppState, Screen};
use std::{
    collections::HashMap,
    ffi::{c_char, CStr, CString},
    ptr,
    sync::Mutex,
};

const STORE_FILE_NAME: &str = "store.json";

static APP: Mutex<Option<App>> = Mutex::new(None);

/// UI state plus the injected services every handler works through.
pub struct App {
    pub(crate) state: AppState,
    pub(crate) store: Box<dyn KeyValueStore>,
    pub(crate) remote: Box<dyn Remote>,
    pub(crate) config: Config,
}

impl App {
    /// Restores any saved session from `store`.
    pub fn new(config: Config, store: Box<dyn KeyValueStore>, remote: Box<dyn Remote>) -> Self {
        let mut state = AppState::new();
        state.ensure_navigation();
        state.session = load_session(store.as_ref());
        Self {
            state,
            store,
            remote,
            config,
        }
    }

    pub fn from_config(config: Config) -> error::Result<Self> {
        let store = FileStore::open(config.data_dir.join(STORE_FILE_NAME))?;
        let remote = HttpRemote::new(config.clone())?;
        Ok(Self::new(config, Box::new(store), Box::new(remote)))
    }

    pub fn handle(&mut self, input: &str) -> Value {
        handle_command(self, parse_command(input))
    }
}

#[derive(Deserialize, Default)]
struct Command {
    action: String,
    path: Option<String>,
    error: Option<String>,
    mode: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    bindings: Option<HashMap<String, String>>,
}

#[derive(Debug)]
enum Action {
    Init,
    Reset,
    Back,
    Home,
    LoginScreen,
    RegisterScreen,
    DashboardScreen,
    About,
    LoginSubmit(Credentials),
    RegisterSubmit(Credentials),
    Logout,
    DashboardFileSelected { path: Option<String> },
    DashboardUpload,
    OverlayOpen { url: Option<String> },
    OverlayClose,
    SignatureMode(InputMode),
    SignaturePointerDown { x: f32, y: f32 },
    SignaturePointerMove { x: f32, y: f32 },
    SignaturePointerUp,
    SignatureSave,
    SignatureClear,
    SignatureUpload { path: Option<String> },
    SignatureReset,
    SignatureDragEnd { dx: Option<f64>, dy: Option<f64> },
    SignatureDownload,
}

fn parse_command(input: &str) -> Command {
    serde_json::from_str(input).unwrap_or_else(|e| Command {
        action: "error".into(),
        error: Some(format!("invalid_json:{e}")),
        ..Command::default()
    })
}

fn credentials(bindings: &HashMap<String, String>) -> Credentials {
    Credentials {
        name: bindings.get("name").cloned(),
        email: bindings.get("email").cloned(),
        password: bindings.get("password").cloned(),
    }
}

fn pointer(x: Option<f64>, y: Option<f64>) -> Result<(f32, f32), String> {
    match (x, y) {
        (Some(x), Some(y)) => Ok((x as f32, y as f32)),
        _ => Err("missing_pointer_coordinates".into()),
    }
}

fn parse_action(command: Command) -> Result<Action, String> {
    let Command {
        action,
        path,
        error,
        mode,
        x,
        y,
        dx,
        dy,
        bindings,
    } = command;

    let bindings = bindings.unwrap_or_default();

    match action.as_str() {
        "init" => Ok(Action::Init),
        "reset" => Ok(Action::Reset),
        "back" => Ok(Action::Back),
        "home" => Ok(Action::Home),
        "login_screen" => Ok(Action::LoginScreen),
        "register_screen" => Ok(Action::RegisterScreen),
        "dashboard_screen" => Ok(Action::DashboardScreen),
        "about" => Ok(Action::About),
        "login_submit" => Ok(Action::LoginSubmit(credentials(&bindings))),
        "register_submit" => Ok(Action::RegisterSubmit(credentials(&bindings))),
        "logout" => Ok(Action::Logout),
        "dashboard_file_selected" => Ok(Action::DashboardFileSelected { path }),
        "dashboard_upload" => Ok(Action::DashboardUpload),
        "overlay_open" => Ok(Action::OverlayOpen { url: path }),
        "overlay_close" => Ok(Action::OverlayClose),
        "signature_mode" => {
            let raw = mode
                .or_else(|| bindings.get("mode").cloned())
                .unwrap_or_default();
            InputMode::parse(&raw)
                .map(Action::SignatureMode)
                .ok_or_else(|| format!("invalid_mode:{raw}"))
        }
        "signature_pointer_down" => {
            let (x, y) = pointer(x, y)?;
            Ok(Action::SignaturePointerDown { x, y })
        }
        "signature_pointer_move" => {
            let (x, y) = pointer(x, y)?;
            Ok(Action::SignaturePointerMove { x, y })
        }
        "signature_pointer_up" | "signature_pointer_leave" => Ok(Action::SignaturePointerUp),
        "signature_save" => Ok(Action::SignatureSave),
        "signature_clear" => Ok(Action::SignatureClear),
        "signature_upload" => Ok(Action::SignatureUpload { path }),
        "signature_reset" => Ok(Action::SignatureReset),
        "signature_drag_end" => Ok(Action::SignatureDragEnd { dx, dy }),
        "signature_download" => Ok(Action::SignatureDownload),
        other => Err(error.unwrap_or_else(|| format!("unknown_action:{other}"))),
    }
}

fn handle_command(app: &mut App, command: Command) -> Value {
    app.state.ensure_navigation();
    app.state.clear_transient();

    let action = match parse_action(command) {
        Ok(action) => action,
        Err(err) => {
            log::warn!("rejected command: {err}");
            app.state.alert(format!("Error: {err}"));
            return render_ui(&app.state);
        }
    };

    match action {
        Action::Init => {
            // Keep current state; ensure navigation is initialized.
            app.state.ensure_navigation();
        }
        Action::Reset => {
            app.state.reset_runtime();
            app.state.session = load_session(app.store.as_ref());
            app.state.reset_navigation();
        }
        Action::Back => {
            if app.state.overlay.is_some() {
                overlay::close_overlay(app);
            } else {
                app.state.pop_screen();
            }
        }
        Action::Home => app.state.reset_navigation(),
        Action::LoginScreen => app.state.push_screen(Screen::Login),
        Action::RegisterScreen => app.state.push_screen(Screen::Register),
        Action::DashboardScreen => open_dashboard(app),
        Action::About => app.state.push_screen(Screen::About),
        Action::LoginSubmit(creds) => handle_login(app, &creds),
        Action::RegisterSubmit(creds) => handle_register(app, &creds),
        Action::Logout => handle_logout(app),
        Action::DashboardFileSelected { path } => handle_file_selected(&mut app.state, path.as_deref()),
        Action::DashboardUpload => handle_upload(app),
        Action::OverlayOpen { url } => overlay::open_overlay(app, url.as_deref()),
        Action::OverlayClose => overlay::close_overlay(app),
        Action::SignatureMode(mode) => overlay::set_mode(app, mode),
        Action::SignaturePointerDown { x, y } => overlay::pointer_down(app, x, y),
        Action::SignaturePointerMove { x, y } => overlay::pointer_move(app, x, y),
        Action::SignaturePointerUp => overlay::pointer_up(app),
        Action::SignatureSave => overlay::save_drawn(app),
        Action::SignatureClear => overlay::clear_canvas(app),
        Action::SignatureUpload { path } => overlay::upload_signature(app, path.as_deref()),
        Action::SignatureReset => overlay::reset_signature(app),
        Action::SignatureDragEnd { dx, dy } => overlay::drag_end(app, dx, dy),
        Action::SignatureDownload => overlay::handle_download_signed(app),
    }

    render_ui(&app.state)
}

fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message }
        ]
    })
}

fn render_ui(state: &AppState) -> Value {
    match state.current_screen() {
        Screen::Home => render_home_screen(state),
        Screen::Login => render_login_screen(state),
        Screen::Register => render_register_screen(state),
        Screen::Dashboard => render_dashboard_screen(state),
        Screen::About => render_about_screen(state),
    }
}

/// Runs one host command against the process-wide app, creating it from
/// [`Config::load`] on first use.
pub fn dispatch(input: &str) -> String {
    let mut guard = match APP.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::error!("app state poisoned, continuing with last state");
            poisoned.into_inner()
        }
    };
    if guard.is_none() {
        match Config::load().and_then(App::from_config) {
            Ok(app) => *guard = Some(app),
            Err(e) => {
                log::error!("startup failed: {e}");
                return error_ui(&e.to_string()).to_string();
            }
        }
    }
    match guard.as_mut() {
        Some(app) => app.handle(input).to_string(),
        None => error_ui("not_initialized").to_string(),
    }
}

#[no_mangle]
pub extern "C" fn snapsign_dispatch(input: *const c_char) -> *mut c_char {
    let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let input_str = if input.is_null() {
            r#"{"action":"init"}"#.to_string()
        } else {
            unsafe { CStr::from_ptr(input) }
                .to_string_lossy()
                .into_owned()
        };
        dispatch(&input_str)
    }));

    let output = response.unwrap_or_else(|_| error_ui("panic").to_string());
    CString::new(output)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// # Safety
/// `s` must come from [`snapsign_dispatch`] and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn snapsign_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

use crate::features::auth::Session;
use crate::features::dashboard::DashboardState;
use crate::features::overlay::OverlayState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Screen {
    Home,
    Login,
    Register,
    Dashboard,
    About,
}

pub struct AppState {
    pub nav_stack: Vec<Screen>,
    /// Pending blocking dialog text; the host shows it once and it is
    /// cleared at the start of the next command.
    pub alert: Option<String>,
    pub session: Option<Session>,
    pub dashboard: DashboardState,
    pub overlay: Option<OverlayState>,
}

impl AppState {
    pub const fn new() -> Self {
        Self {
            nav_stack: Vec::new(),
            alert: None,
            session: None,
            dashboard: DashboardState::new(),
            overlay: None,
        }
    }

    pub fn ensure_navigation(&mut self) {
        if self.nav_stack.is_empty() {
            self.nav_stack.push(Screen::Home);
        }
    }

    pub fn current_screen(&self) -> Screen {
        self.nav_stack.last().copied().unwrap_or(Screen::Home)
    }

    pub fn nav_depth(&self) -> usize {
        let depth = self.nav_stack.len();
        if depth == 0 {
            1
        } else {
            depth
        }
    }

    pub fn push_screen(&mut self, screen: Screen) {
        self.ensure_navigation();
        if self.current_screen() != screen {
            self.nav_stack.push(screen);
        }
    }

    pub fn replace_current(&mut self, screen: Screen) {
        self.ensure_navigation();
        if let Some(last) = self.nav_stack.last_mut() {
            *last = screen;
        }
    }

    pub fn pop_screen(&mut self) {
        self.ensure_navigation();
        if self.nav_stack.len() > 1 {
            self.nav_stack.pop();
        }
    }

    pub fn reset_navigation(&mut self) {
        self.nav_stack.clear();
        self.nav_stack.push(Screen::Home);
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    /// Clears what a render shows only once: the alert and any pending auto
    /// download.
    pub fn clear_transient(&mut self) {
        self.alert = None;
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.pending_download = None;
        }
    }

    /// Drops everything tied to the signed-in user.
    pub fn reset_runtime(&mut self) {
        self.alert = None;
        self.session = None;
        self.dashboard.reset();
        self.overlay = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_never_empties_the_stack() {
        let mut state = AppState::new();
        state.pop_screen();
        assert_eq!(state.current_screen(), Screen::Home);
        assert_eq!(state.nav_depth(), 1);
    }

    #[test]
    fn pushing_the_current_screen_does_not_stack() {
        let mut state = AppState::new();
        state.push_screen(Screen::About);
        state.push_screen(Screen::About);
        assert_eq!(state.nav_stack, vec![Screen::Home, Screen::About]);
        state.pop_screen();
        assert_eq!(state.current_screen(), Screen::Home);
    }

    #[test]
    fn replace_keeps_depth() {
        let mut state = AppState::new();
        state.push_screen(Screen::Dashboard);
        state.replace_current(Screen::Login);
        assert_eq!(state.nav_stack, vec![Screen::Home, Screen::Login]);
    }
}

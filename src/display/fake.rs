//! In-memory display for tests. Clones share state so a test can inspect a
//! display it handed to a `Screen`.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{Backlight, Buttons, CharDisplay};

#[derive(thiserror::Error, Debug)]
#[error("fake display failure")]
pub struct FakeError;

#[derive(Debug, Default)]
struct FakeState {
    text: String,
    history: Vec<String>,
    clears: usize,
    enabled: bool,
    backlight: Backlight,
    presses: VecDeque<Buttons>,
    fail_buttons: bool,
}

#[derive(Clone, Debug, Default)]
pub struct FakeDisplay {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDisplay {
    pub fn text(&self) -> String {
        self.state.lock().unwrap().text.clone()
    }

    /// Every message written, oldest first
    pub fn history(&self) -> Vec<String> {
        self.state.lock().unwrap().history.clone()
    }

    pub fn clears(&self) -> usize {
        self.state.lock().unwrap().clears
    }

    pub fn enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }

    pub fn backlight(&self) -> Backlight {
        self.state.lock().unwrap().backlight
    }

    /// Queue a button snapshot returned by the next `buttons` call
    pub fn press(&self, buttons: Buttons) {
        self.state.lock().unwrap().presses.push_back(buttons);
    }

    pub fn fail_buttons(&self, fail: bool) {
        self.state.lock().unwrap().fail_buttons = fail;
    }
}

impl CharDisplay for FakeDisplay {
    type Error = FakeError;

    fn clear(&mut self) -> Result<(), FakeError> {
        let mut state = self.state.lock().unwrap();
        state.text.clear();
        state.clears += 1;
        Ok(())
    }

    fn write_message(&mut self, message: &str) -> Result<(), FakeError> {
        let mut state = self.state.lock().unwrap();
        state.text = message.to_string();
        state.history.push(message.to_string());
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), FakeError> {
        self.state.lock().unwrap().enabled = enabled;
        Ok(())
    }

    fn set_backlight(&mut self, backlight: Backlight) -> Result<(), FakeError> {
        self.state.lock().unwrap().backlight = backlight;
        Ok(())
    }

    fn buttons(&mut self) -> Result<Buttons, FakeError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_buttons {
            return Err(FakeError);
        }
        Ok(state.presses.pop_front().unwrap_or_default())
    }
}

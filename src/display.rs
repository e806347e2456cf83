//! Character display abstraction and the shared handle both background
//! services write through.
pub mod console;
#[cfg(test)]
pub mod fake;
pub mod rgb_lcd_plate;

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Error, anyhow};
use clap::ValueEnum;

/// Backlight channels of an RGB character LCD. Each channel is either on or off.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Backlight {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
}

impl Backlight {
    pub const OFF: Backlight = Backlight {
        red: false,
        green: false,
        blue: false,
    };
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BacklightColor {
    #[default]
    Red,
    Green,
    Blue,
    Yellow,
    Teal,
    Violet,
    White,
}

impl From<BacklightColor> for Backlight {
    fn from(value: BacklightColor) -> Self {
        let (red, green, blue) = match value {
            BacklightColor::Red => (true, false, false),
            BacklightColor::Green => (false, true, false),
            BacklightColor::Blue => (false, false, true),
            BacklightColor::Yellow => (true, true, false),
            BacklightColor::Teal => (false, true, true),
            BacklightColor::Violet => (true, false, true),
            BacklightColor::White => (true, true, true),
        };

        Backlight { red, green, blue }
    }
}

/// Snapshot of the five buttons. true means held down.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Buttons {
    pub select: bool,
    pub right: bool,
    pub down: bool,
    pub up: bool,
    pub left: bool,
}

pub trait CharDisplay {
    type Error: std::error::Error + Send + Sync + 'static;

    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Write `message` starting at the top left corner. Lines are separated by `\n`.
    fn write_message(&mut self, message: &str) -> Result<(), Self::Error>;

    /// Turn the LCD itself on or off. Its contents are kept.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error>;

    fn set_backlight(&mut self, backlight: Backlight) -> Result<(), Self::Error>;

    fn buttons(&mut self) -> Result<Buttons, Self::Error>;
}

struct ScreenState<D> {
    display: D,
    enabled: bool,
    backlight: Backlight,
}

/// Cloneable handle to the display. Every access goes through one lock.
pub struct Screen<D> {
    state: Arc<Mutex<ScreenState<D>>>,
}

impl<D> Clone for Screen<D> {
    fn clone(&self) -> Self {
        Screen {
            state: self.state.clone(),
        }
    }
}

impl<D: CharDisplay> Screen<D> {
    pub fn new(display: D, backlight: Backlight) -> Self {
        Screen {
            state: Arc::new(Mutex::new(ScreenState {
                display,
                enabled: false,
                backlight,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ScreenState<D>>, Error> {
        self.state
            .lock()
            .map_err(|_| anyhow!("display lock poisoned"))
    }

    /// Clear the display and switch it and the backlight on
    pub fn init(&self) -> Result<(), Error> {
        let mut state = self.lock()?;
        state.display.clear()?;
        let backlight = state.backlight;
        state.display.set_backlight(backlight)?;
        state.display.set_enabled(true)?;
        state.enabled = true;

        Ok(())
    }

    pub fn show(&self, message: &str) -> Result<(), Error> {
        self.lock()?.display.write_message(message)?;

        Ok(())
    }

    pub fn clear(&self) -> Result<(), Error> {
        self.lock()?.display.clear()?;

        Ok(())
    }

    /// Replace whatever is on screen with `message`
    pub fn replace(&self, message: &str) -> Result<(), Error> {
        let mut state = self.lock()?;
        state.display.clear()?;
        state.display.write_message(message)?;

        Ok(())
    }

    pub fn is_enabled(&self) -> Result<bool, Error> {
        Ok(self.lock()?.enabled)
    }

    pub fn set_power(&self, on: bool) -> Result<(), Error> {
        let mut state = self.lock()?;

        if on {
            let backlight = state.backlight;
            state.display.set_backlight(backlight)?;
            state.display.set_enabled(true)?;
        } else {
            state.display.set_enabled(false)?;
            state.display.set_backlight(Backlight::OFF)?;
        }
        state.enabled = on;

        Ok(())
    }

    /// Returns the new power state
    pub fn toggle_power(&self) -> Result<bool, Error> {
        let on = !self.is_enabled()?;
        self.set_power(on)?;

        Ok(on)
    }

    pub fn buttons(&self) -> Result<Buttons, Error> {
        Ok(self.lock()?.display.buttons()?)
    }

    /// Leave the display blank and dark
    pub fn shutdown(&self) -> Result<(), Error> {
        let mut state = self.lock()?;
        state.display.clear()?;
        state.display.set_enabled(false)?;
        state.display.set_backlight(Backlight::OFF)?;
        state.enabled = false;

        Ok(())
    }
}

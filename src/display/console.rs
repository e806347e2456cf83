use std::convert::Infallible;

use itertools::Itertools;
use tracing::info;

use super::{Backlight, Buttons, CharDisplay};

/// Stand-in for the LCD that logs what would be shown. Useful without hardware.
#[derive(Debug)]
pub struct ConsoleDisplay {
    columns: usize,
}

impl ConsoleDisplay {
    pub fn new(columns: usize) -> Self {
        ConsoleDisplay { columns }
    }
}

impl CharDisplay for ConsoleDisplay {
    type Error = Infallible;

    fn clear(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn write_message(&mut self, message: &str) -> Result<(), Infallible> {
        let rendered = message
            .lines()
            .map(|l| format!("|{:<width$.width$}|", l, width = self.columns))
            .join("\n");

        info!("display:\n{rendered}");

        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), Infallible> {
        info!(enabled, "display power");
        Ok(())
    }

    fn set_backlight(&mut self, backlight: Backlight) -> Result<(), Infallible> {
        info!(?backlight, "backlight");
        Ok(())
    }

    fn buttons(&mut self) -> Result<Buttons, Infallible> {
        Ok(Buttons::default())
    }
}

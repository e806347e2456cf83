use std::time::Duration;

use clap::Parser;
use itertools::Itertools;

use crate::background_services::departure_fetcher::DEFAULT_API_URL;
use crate::display::BacklightColor;
use crate::display::rgb_lcd_plate::DEFAULT_ADDRESS;
use crate::model::stop::{StopGroup, StopSelection};
use crate::utils::parse_u8_auto_radix;

const DEFAULT_REFRESH_SECS: u64 = 10;

/// Shows the next Wiener Linien departures on an RGB character LCD plate
#[derive(Debug, Parser)]
#[command(
    name = "wl_monitor",
    after_help = "example:  wl_monitor -t 5 -k xxxxxxxx 232:222 18:46 525"
)]
pub struct Args {
    /// API key
    #[arg(short, long, env = "WL_API_KEY", hide_env_values = true)]
    pub key: String,

    /// Refresh time in seconds. Values below 1 keep the default.
    #[arg(
        short,
        long,
        value_name = "TIME",
        default_value_t = DEFAULT_REFRESH_SECS as i64,
        allow_negative_numbers = true
    )]
    pub time: i64,

    /// RBL number, optionally paired with the RBL of the other direction
    #[arg(value_name = "RBL[:RBL]", required = true)]
    pub stops: Vec<StopSelection>,

    /// Seconds without a button press before the screen switches off
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 20,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub screen_timeout: u64,

    /// Backlight colour
    #[arg(long, value_enum, default_value_t = BacklightColor::Red)]
    pub color: BacklightColor,

    /// I2C bus the LCD plate is attached to
    #[arg(long, env = "LCD_I2C_BUS", default_value = "/dev/i2c-1")]
    pub i2c_bus: String,

    /// I2C address of the LCD plate's port expander
    #[arg(long, value_parser = parse_u8_auto_radix, default_value_t = DEFAULT_ADDRESS)]
    pub lcd_address: u8,

    /// Monitor URL, `{rbl}` and `{apikey}` get replaced
    #[arg(long, env = "WL_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Log the display contents instead of driving the LCD
    #[arg(long)]
    pub console: bool,
}

impl Args {
    pub fn refresh_interval(&self) -> Duration {
        match u64::try_from(self.time) {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }

    pub fn screen_timeout(&self) -> Duration {
        Duration::from_secs(self.screen_timeout)
    }

    pub fn stop_groups(&self) -> Vec<StopGroup> {
        self.stops.iter().cloned().map(StopGroup::from).collect_vec()
    }
}

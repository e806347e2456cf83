use std::str::FromStr;

use chrono::{DateTime, Local};

use crate::utils::replace_umlauts;

use super::wl_api_model::Departure;

/// A monitored stop and the last departure the API reported for it
#[derive(Clone, Debug, PartialEq)]
pub struct Stop {
    /// RBL number
    pub id: String,
    pub line: String,
    pub station: String,
    pub direction: String,
    /// Minutes until the next departure. None until the first successful poll.
    pub countdown: Option<u32>,
    pub updated_at: Option<DateTime<Local>>,
}

impl Stop {
    pub fn new(id: impl Into<String>) -> Self {
        Stop {
            id: id.into(),
            line: String::new(),
            station: String::new(),
            direction: String::new(),
            countdown: None,
            updated_at: None,
        }
    }

    pub fn update(&mut self, departure: Departure) {
        self.line = departure.line;
        self.station = departure.station;
        self.direction = departure.direction;
        self.countdown = Some(departure.countdown);
        self.updated_at = Some(Local::now());
    }

    /// The two line message shown on the LCD
    pub fn display_text(&self) -> String {
        let countdown = match self.countdown {
            Some(minutes) => format!("{minutes:02}"),
            None => "--".to_string(),
        };

        replace_umlauts(&format!(
            "{} {}\n{} {}",
            self.line, self.station, countdown, self.direction
        ))
    }
}

/// One entry of the stop list. A pair holds both directions of a station.
#[derive(Clone, Debug, PartialEq)]
pub enum StopGroup {
    Single(Stop),
    Pair(Stop, Stop),
}

impl StopGroup {
    pub fn stop(&self, reversed: bool) -> &Stop {
        match self {
            StopGroup::Single(stop) => stop,
            StopGroup::Pair(first, _) if !reversed => first,
            StopGroup::Pair(_, second) => second,
        }
    }

    pub fn stop_mut(&mut self, reversed: bool) -> &mut Stop {
        match self {
            StopGroup::Single(stop) => stop,
            StopGroup::Pair(first, _) if !reversed => first,
            StopGroup::Pair(_, second) => second,
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, StopGroup::Pair(..))
    }
}

/// A stop as given on the command line, `RBL` or `RBL:RBL`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopSelection {
    Single(String),
    Pair(String, String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StopSelectionError {
    #[error("empty RBL number")]
    Empty,

    #[error("expected RBL or RBL:RBL, got {0:?}")]
    TooManyDirections(String),
}

impl FromStr for StopSelection {
    type Err = StopSelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();

        if parts.iter().any(|p| p.is_empty()) {
            return Err(StopSelectionError::Empty);
        }

        match parts.as_slice() {
            [id] => Ok(StopSelection::Single(id.to_string())),
            [first, second] => Ok(StopSelection::Pair(first.to_string(), second.to_string())),
            _ => Err(StopSelectionError::TooManyDirections(s.to_string())),
        }
    }
}

impl From<StopSelection> for StopGroup {
    fn from(value: StopSelection) -> Self {
        match value {
            StopSelection::Single(id) => StopGroup::Single(Stop::new(id)),
            StopSelection::Pair(first, second) => {
                StopGroup::Pair(Stop::new(first), Stop::new(second))
            }
        }
    }
}

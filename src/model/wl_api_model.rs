//! Response of the Wiener Linien realtime monitor endpoint.
//!
//! Every field is optional. Only the few fields we show are extracted and a
//! missing one is reported by its path.
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MonitorResponse {
    pub data: Option<MonitorData>,
    pub message: Option<ApiMessage>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MonitorData {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub location_stop: Option<LocationStop>,
    #[serde(default)]
    pub lines: Vec<WlLine>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LocationStop {
    pub properties: Option<StopProperties>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StopProperties {
    /// Station name, e.g. "Karlsplatz"
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WlLine {
    pub name: Option<String>,
    /// Final destination. Usually upper case with trailing padding.
    pub towards: Option<String>,
    pub departures: Option<Departures>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Departures {
    #[serde(default)]
    pub departure: Vec<DepartureEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureEntry {
    pub departure_time: Option<DepartureTime>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DepartureTime {
    pub countdown: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMessage {
    pub value: Option<String>,
    /// 1 means OK
    pub message_code: Option<i32>,
    pub server_time: Option<String>,
}

impl ApiMessage {
    pub fn is_ok(&self) -> bool {
        self.message_code.is_none_or(|code| code == 1)
    }
}

/// The next departure of the first line served by a stop
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Departure {
    pub line: String,
    pub station: String,
    pub direction: String,
    pub countdown: u32,
}

impl TryFrom<MonitorResponse> for Departure {
    /// Path of the first missing field
    type Error = &'static str;

    fn try_from(value: MonitorResponse) -> Result<Self, Self::Error> {
        let monitor = value
            .data
            .ok_or("data")?
            .monitors
            .into_iter()
            .next()
            .ok_or("data.monitors[0]")?;

        let station = monitor
            .location_stop
            .and_then(|l| l.properties)
            .and_then(|p| p.title)
            .ok_or("data.monitors[0].locationStop.properties.title")?;

        let line = monitor
            .lines
            .into_iter()
            .next()
            .ok_or("data.monitors[0].lines[0]")?;

        let name = line.name.ok_or("data.monitors[0].lines[0].name")?;
        let direction = line.towards.ok_or("data.monitors[0].lines[0].towards")?;

        let countdown = line
            .departures
            .and_then(|d| d.departure.into_iter().next())
            .and_then(|d| d.departure_time)
            .and_then(|t| t.countdown)
            .ok_or("data.monitors[0].lines[0].departures.departure[0].departureTime.countdown")?;

        Ok(Departure {
            line: name.trim().to_string(),
            station: station.trim().to_string(),
            direction: direction.trim().to_string(),
            countdown,
        })
    }
}

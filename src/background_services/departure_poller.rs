//! Periodically fetches the selected stop and shows it on the display
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Error, anyhow};
use tokio::select;
use tokio::sync::watch::Receiver;
use tokio::time::sleep;
use tracing::{Instrument, error, info, info_span};

use crate::background_services::departure_fetcher::DepartureSource;
use crate::display::{CharDisplay, Screen};
use crate::model::stop_cycle::{StopCycle, lock_cycle};

/// Polls forever. Fetch failures are logged and never end the loop.
pub async fn poll_departures<S, D>(
    source: &S,
    screen: &Screen<D>,
    cycle: &Mutex<StopCycle>,
    mut switching: Receiver<bool>,
    refresh: Duration,
) -> Result<(), Error>
where
    S: DepartureSource + Sync,
    D: CharDisplay,
{
    let mut clear_pending = false;

    loop {
        poll_once(source, screen, cycle, &mut switching, &mut clear_pending).await?;

        // Switching stops ends the wait early so the new stop shows up right away.
        select! {
            _ = sleep(refresh) => {}
            changed = switching.changed() => {
                if changed.is_err() {
                    info!("Button listener is gone, polling on the refresh interval only");
                    sleep(refresh).await;
                }
            }
        }
    }
}

/// One poll cycle. Only a poisoned lock or a closed switching channel is an error.
pub async fn poll_once<S, D>(
    source: &S,
    screen: &Screen<D>,
    cycle: &Mutex<StopCycle>,
    switching: &mut Receiver<bool>,
    clear_pending: &mut bool,
) -> Result<(), Error>
where
    S: DepartureSource + Sync,
    D: CharDisplay,
{
    if *switching.borrow() {
        *clear_pending = true;
        switching
            .wait_for(|s| !*s)
            .instrument(info_span!("Waiting for the stop switch to finish"))
            .await?;
    }

    let (cursor, stop_id) = {
        let cycle = lock_cycle(cycle)?;
        (cycle.cursor(), cycle.current().id.clone())
    };

    let departure = source.fetch_departure(&stop_id).await;

    let message = {
        let mut cycle = lock_cycle(cycle)?;
        let stop = cycle
            .stop_at_mut(cursor)
            .ok_or_else(|| anyhow!("stop {stop_id} disappeared from the list"))?;

        match departure {
            Ok(departure) => {
                info!(
                    %stop_id,
                    line = %departure.line,
                    countdown = departure.countdown,
                    "got departure"
                );
                stop.update(departure);
            }
            Err(e) => {
                error!("Error fetching departure for stop {stop_id}: {e}");
                if let Some(updated_at) = stop.updated_at {
                    info!("Showing departure from {}", updated_at.format("%H:%M:%S"));
                }
            }
        }

        stop.display_text()
    };

    if *clear_pending {
        *clear_pending = false;
        if let Err(e) = screen.clear() {
            error!("Error clearing the display: {e}");
        }
    }

    if !*switching.borrow() {
        if let Err(e) = screen.show(&message) {
            error!("Error writing to the display: {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background_services::departure_fetcher::{FetchError, parse_departure};
    use crate::display::Backlight;
    use crate::display::fake::FakeDisplay;
    use crate::model::stop::{StopGroup, StopSelection};
    use crate::model::wl_api_model::Departure;
    use std::collections::VecDeque;
    use tokio::sync::watch;
    use tokio::time::{Instant, timeout};

    /// Hands out canned response bodies in order and records requested stops
    #[derive(Default)]
    struct ScriptedSource {
        bodies: Mutex<VecDeque<String>>,
        requested: Mutex<Vec<String>>,
        fetched_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(bodies: &[&str]) -> Self {
            ScriptedSource {
                bodies: Mutex::new(bodies.iter().map(|b| b.to_string()).collect()),
                requested: Mutex::default(),
                fetched_at: Mutex::default(),
            }
        }
    }

    impl DepartureSource for ScriptedSource {
        async fn fetch_departure(&self, stop_id: &str) -> Result<Departure, FetchError> {
            self.requested.lock().unwrap().push(stop_id.to_string());
            self.fetched_at.lock().unwrap().push(Instant::now());
            let body = self.bodies.lock().unwrap().pop_front().unwrap_or_default();
            parse_departure(body)
        }
    }

    const OK_BODY: &str = r#"{"data":{"monitors":[{
        "locationStop":{"properties":{"title":"Schwedenplatz"}},
        "lines":[{"name":"U1","towards":"LEOPOLDAU","departures":{"departure":[
            {"departureTime":{"countdown":5}}
        ]}}]
    }]}}"#;

    fn setup(args: &[&str]) -> (FakeDisplay, Screen<FakeDisplay>, Mutex<StopCycle>) {
        let fake = FakeDisplay::default();
        let screen = Screen::new(fake.clone(), Backlight::default());
        let groups = args
            .iter()
            .map(|a| StopGroup::from(a.parse::<StopSelection>().unwrap()))
            .collect();

        (fake, screen, Mutex::new(StopCycle::new(groups).unwrap()))
    }

    #[tokio::test]
    async fn test_poll_once_shows_departure() -> Result<(), anyhow::Error> {
        let (fake, screen, cycle) = setup(&["4111:4118"]);
        let source = ScriptedSource::new(&[OK_BODY]);
        let (_tx, mut rx) = watch::channel(false);
        let mut clear_pending = false;

        poll_once(&source, &screen, &cycle, &mut rx, &mut clear_pending).await?;

        assert_eq!(fake.text(), "U1 Schwedenplatz\n05 LEOPOLDAU");
        assert_eq!(*source.requested.lock().unwrap(), vec!["4111"]);
        assert_eq!(cycle.lock().unwrap().current().countdown, Some(5));

        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_responses_do_not_stop_polling() -> Result<(), anyhow::Error> {
        let (fake, screen, cycle) = setup(&["4111"]);
        let source = ScriptedSource::new(&[
            "",
            "not json",
            r#"{"data":null}"#,
            r#"{"data":{"monitors":[{"lines":[{"name":"U1"}]}]}}"#,
            "[1, 2, 3]",
            OK_BODY,
            r#"{"message":{"value":"Key ungültig","messageCode":311}}"#,
        ]);
        let (_tx, mut rx) = watch::channel(false);
        let mut clear_pending = false;

        for _ in 0..5 {
            poll_once(&source, &screen, &cycle, &mut rx, &mut clear_pending).await?;
            assert_eq!(fake.text(), " \n-- ");
        }

        poll_once(&source, &screen, &cycle, &mut rx, &mut clear_pending).await?;
        assert_eq!(fake.text(), "U1 Schwedenplatz\n05 LEOPOLDAU");

        // A later failure keeps the last good departure on screen.
        poll_once(&source, &screen, &cycle, &mut rx, &mut clear_pending).await?;
        assert_eq!(fake.text(), "U1 Schwedenplatz\n05 LEOPOLDAU");
        assert_eq!(source.requested.lock().unwrap().len(), 7);

        Ok(())
    }

    #[tokio::test]
    async fn test_poll_once_waits_for_switch_and_clears() -> Result<(), anyhow::Error> {
        let (fake, screen, cycle) = setup(&["4111", "4205"]);
        let source = ScriptedSource::new(&[OK_BODY]);
        let (tx, mut rx) = watch::channel(true);
        let mut clear_pending = false;

        cycle.lock().unwrap().next_station();
        screen.replace("Switching\n   Station...")?;

        let poll = poll_once(&source, &screen, &cycle, &mut rx, &mut clear_pending);
        let release = async {
            tokio::task::yield_now().await;
            assert!(source.requested.lock().unwrap().is_empty());
            tx.send_replace(false);
        };
        let (polled, ()) = tokio::join!(poll, release);
        polled?;

        assert_eq!(*source.requested.lock().unwrap(), vec!["4205"]);
        assert_eq!(fake.clears(), 2);
        assert!(!clear_pending);
        assert_eq!(fake.text(), "U1 Schwedenplatz\n05 LEOPOLDAU");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_departures_survives_failures() -> Result<(), anyhow::Error> {
        let (fake, screen, cycle) = setup(&["4111"]);
        let source = ScriptedSource::new(&["garbage", "", OK_BODY]);
        let (_tx, rx) = watch::channel(false);

        let poller = poll_departures(&source, &screen, &cycle, rx, Duration::from_secs(10));
        let result = tokio::time::timeout(Duration::from_secs(25), poller).await;

        assert!(result.is_err(), "poll loop ended early: {result:?}");
        assert_eq!(source.requested.lock().unwrap().len(), 3);
        assert_eq!(fake.text(), "U1 Schwedenplatz\n05 LEOPOLDAU");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_stops_ends_the_wait_early() -> Result<(), anyhow::Error> {
        let (fake, screen, cycle) = setup(&["4111", "4205"]);
        let source = ScriptedSource::new(&[OK_BODY, OK_BODY]);
        let (tx, rx) = watch::channel(false);

        let poller = poll_departures(&source, &screen, &cycle, rx, Duration::from_secs(60));
        let press_up = async {
            sleep(Duration::from_secs(1)).await;
            tx.send_replace(true);
            cycle.lock().unwrap().next_station();
            tx.send_replace(false);
        };
        let (result, ()) = tokio::join!(timeout(Duration::from_secs(5), poller), press_up);

        assert!(result.is_err(), "poll loop ended early: {result:?}");
        assert_eq!(*source.requested.lock().unwrap(), vec!["4111", "4205"]);
        let fetched_at = source.fetched_at.lock().unwrap();
        assert_eq!(fetched_at[1] - fetched_at[0], Duration::from_secs(1));
        assert_eq!(fake.text(), "U1 Schwedenplatz\n05 LEOPOLDAU");

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_departures_keeps_interval_without_listener() -> Result<(), anyhow::Error> {
        let (_fake, screen, cycle) = setup(&["4111"]);
        let source = ScriptedSource::new(&[OK_BODY, OK_BODY, OK_BODY]);
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let poller = poll_departures(&source, &screen, &cycle, rx, Duration::from_secs(10));
        let result = timeout(Duration::from_secs(25), poller).await;

        assert!(result.is_err(), "poll loop ended early: {result:?}");
        let fetched_at = source.fetched_at.lock().unwrap();
        let gaps: Vec<Duration> = fetched_at.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps, vec![Duration::from_secs(10), Duration::from_secs(10)]);

        Ok(())
    }
}

//! Reacts to the LCD plate buttons: cycles stops, flips direction, switches
//! the screen on and off and puts it to sleep after a period of inactivity.
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Error;
use tokio::sync::watch::Sender;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info};

use crate::display::{Buttons, CharDisplay, Screen};
use crate::model::stop_cycle::{StopCycle, lock_cycle};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DEBOUNCE: Duration = Duration::from_millis(200);
const NO_DIRECTION_DELAY: Duration = Duration::from_secs(2);

pub const SWITCHING_STATION: &str = "Switching\n   Station...";
pub const SWITCHING_DIRECTION: &str = "Switching\n   Direction...";
pub const NO_OTHER_DIRECTION: &str = "No other direc-\ntion specified.";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    PreviousStation,
    NextStation,
    ToggleDirection,
    TogglePower,
}

impl ButtonAction {
    /// Down wins over up, up over left/right, left/right over select
    pub fn from_buttons(buttons: Buttons) -> Option<Self> {
        if buttons.down {
            Some(ButtonAction::PreviousStation)
        } else if buttons.up {
            Some(ButtonAction::NextStation)
        } else if buttons.left || buttons.right {
            Some(ButtonAction::ToggleDirection)
        } else if buttons.select {
            Some(ButtonAction::TogglePower)
        } else {
            None
        }
    }
}

/// Switches the screen off once after `timeout` without a button press
#[derive(Debug)]
pub struct SleepTimer {
    timeout: Duration,
    deadline: Option<Instant>,
}

impl SleepTimer {
    pub fn new(timeout: Duration) -> Self {
        SleepTimer {
            timeout,
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn reset(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    /// True exactly once per reset, when the deadline has passed
    pub fn expired(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

pub async fn listen_for_buttons<D: CharDisplay>(
    screen: &Screen<D>,
    cycle: &Mutex<StopCycle>,
    switching: &Sender<bool>,
    screen_timeout: Duration,
) -> Result<(), Error> {
    let mut timer = SleepTimer::new(screen_timeout);

    loop {
        let buttons = match screen.buttons() {
            Ok(buttons) => buttons,
            Err(e) => {
                error!("Error reading the buttons: {e}");
                sleep(POLL_INTERVAL).await;
                continue;
            }
        };

        let Some(action) = ButtonAction::from_buttons(buttons) else {
            if timer.expired() && screen.is_enabled()? {
                info!("No button pressed for {screen_timeout:?}, switching the screen off");
                screen.set_power(false)?;
            }
            sleep(POLL_INTERVAL).await;
            continue;
        };

        timer.reset();
        if let Err(e) = handle_action(action, screen, cycle, switching).await {
            error!("Error handling {action:?}: {e}");
        }
        sleep(DEBOUNCE).await;
    }
}

pub async fn handle_action<D: CharDisplay>(
    action: ButtonAction,
    screen: &Screen<D>,
    cycle: &Mutex<StopCycle>,
    switching: &Sender<bool>,
) -> Result<(), Error> {
    debug!(?action, "button pressed");

    if action == ButtonAction::TogglePower {
        let on = screen.toggle_power()?;
        info!(on, "screen toggled");
        return Ok(());
    }

    if !screen.is_enabled()? {
        screen.set_power(true)?;
    }

    // Pause the poll loop until the new selection is in place.
    switching.send_replace(true);
    let result = switch_stop(action, screen, cycle).await;
    switching.send_replace(false);

    result
}

async fn switch_stop<D: CharDisplay>(
    action: ButtonAction,
    screen: &Screen<D>,
    cycle: &Mutex<StopCycle>,
) -> Result<(), Error> {
    match action {
        ButtonAction::PreviousStation | ButtonAction::NextStation => {
            screen.replace(SWITCHING_STATION)?;

            let mut cycle = lock_cycle(cycle)?;
            if action == ButtonAction::NextStation {
                cycle.next_station();
            } else {
                cycle.previous_station();
            }
            info!(stop_id = %cycle.current().id, "switched station");
        }
        ButtonAction::ToggleDirection => {
            let toggled = lock_cycle(cycle)?.toggle_direction();

            if toggled {
                screen.replace(SWITCHING_DIRECTION)?;
                info!("switched direction");
            } else {
                screen.replace(NO_OTHER_DIRECTION)?;
                sleep(NO_DIRECTION_DELAY).await;
            }
        }
        ButtonAction::TogglePower => {}
    }

    Ok(())
}

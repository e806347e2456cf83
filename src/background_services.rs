pub mod button_listener;
pub mod departure_fetcher;
pub mod departure_poller;

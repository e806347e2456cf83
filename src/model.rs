pub mod stop;
pub mod stop_cycle;
pub mod wl_api_model;

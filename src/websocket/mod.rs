mod handler;
mod status_notifier;

pub use handler::ws_handler;
pub use status_notifier::StatusNotifier;

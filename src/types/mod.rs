pub mod bot;
pub mod store;
pub mod ws;

pub use bot::*;
pub use store::*;
pub use ws::*;

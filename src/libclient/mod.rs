pub mod bot;
pub mod state;
pub mod utils;

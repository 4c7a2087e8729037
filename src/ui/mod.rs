//! Terminal UI for hanki.

mod app;
pub mod theme;
mod widgets;

pub use app::App;

//! TUI pane rendering modules
//!
//! - [`source`]: the snippet with syntax highlighting and the error line marked
//! - [`outcome`]: the outcome text, titled by its kind
//! - [`status`]: status bar with outcome kind, elapsed time and keybindings
//!
//! Each module exports one stateless `render_*` function; scroll offsets are
//! owned by [`App`](crate::ui::App) and clamped during rendering.

pub mod outcome;
pub mod source;
pub mod status;

pub use outcome::render_outcome_pane;
pub use source::render_source_pane;
pub use status::render_status_bar;

//! Terminal viewer built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! - **[`app`]**: viewer state, keyboard event loop, pane focus, re-runs
//! - **[`panes`]**: stateless render functions for the source pane, the
//!   outcome pane and the status bar
//! - **[`theme`]**: color palette shared by all panes
//!
//! Construct an [`App`] with an [`Engine`](crate::executor::Engine) and the
//! snippet source, then call [`App::run`](app::App::run).

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;

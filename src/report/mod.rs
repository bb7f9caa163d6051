//! Output of a run.
//!
//! - [`csv_sink`] — one CSV table per target version, rows in ranked order.
//! - [`terminal`] — colored summary box and top device table; respects `--verbose` / `--quiet`.

pub mod csv_sink;
pub mod terminal;

//! Autoplay and remote transport control for a music-streaming collection
//! page.
//!
//! The page-resident side ([`controller`]) correlates the host player's
//! audio element with the rendered track listing and executes transport
//! commands; remote surfaces drive it through the typed [`protocol`]. On
//! native builds pages are served from HTML snapshots and commands travel
//! over an in-process bus; on `wasm32` the controller runs against the live
//! DOM through the `webpage` adapter.

pub mod controller;
pub mod i18n;
pub mod page;
pub mod prefs;
pub mod protocol;
#[cfg(not(target_arch = "wasm32"))]
pub mod remote;
#[cfg(not(target_arch = "wasm32"))]
pub mod service;
#[cfg(not(target_arch = "wasm32"))]
pub mod snapshot;
pub mod tracks;
#[cfg(target_arch = "wasm32")]
pub mod webpage;

#[cfg(test)]
mod page_fixture;

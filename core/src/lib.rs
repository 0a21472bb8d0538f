//! Isostadt: isometric city-building engine.
//!
//! A pure model (grid, catalog, placement, coverage, economy) behind a
//! single controller, [`engine::CityEngine`], with debounced persistence
//! and local fallback. Rendering backends consume
//! [`render::RenderSnapshot`] and never touch the model.

pub mod catalog;
pub mod clock;
pub mod command;
pub mod config;
pub mod coords;
pub mod coverage;
pub mod economy;
pub mod engine;
pub mod error;
pub mod event;
pub mod grid;
pub mod interaction;
pub mod persistence;
pub mod placement;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod types;

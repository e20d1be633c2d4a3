//! Terminal choropleth of US wildfire activity with a guided tour.

pub mod config;
pub mod data;
pub mod error;
pub mod map_draw;
pub mod matcher;
pub mod month;
pub mod palette;
pub mod presentation;
pub mod region;
pub mod state;
pub mod ui;
pub mod view;
pub mod viewport;

//! Weather and WiFi status pager. Two buttons drive three screens on a small
//! monochrome display: weather for a handful of cities, WiFi status, and a
//! WiFi connect/disconnect control.

pub mod button;
pub mod config;
pub mod controller;
pub mod display;
pub mod network;
pub mod state;
pub mod ticker;
pub mod util;
pub mod weather;
pub mod wifi;

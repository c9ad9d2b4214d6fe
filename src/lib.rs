//! Desktop pet library crate: growth, activity rewards, motion and sprite selection.

pub mod activity;
pub mod app;
pub mod asset;
pub mod clock;
pub mod config;
pub mod constants;
pub mod emotion;
pub mod error;
pub mod events;
pub mod formatter;
pub mod growth;
pub mod input;
pub mod motion;
pub mod pet;
pub mod report;
pub mod scheduler;
pub mod simulation;
pub mod sprite;
pub mod store;

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core winding logic (hardware-agnostic).
//!
//! This crate provides the electronic-gearing winding controller. All machine
//! interactions go through `winder_traits::Axis` and `winder_traits::HomeSensor`.
//!
//! ## Architecture
//!
//! - **Geometry**: pass counts, gearing ratio, stepover rotation (`geometry`)
//! - **Layer / Profile**: one winding zone with progress, and the ordered job (`layer`, `profile`)
//! - **Controller**: IDLE → ZEROING → WINDING ⇄ DWELLING → COMPLETE, plus PAUSED (`controller`)
//! - **Configuration**: drive-train constants and motion parameters (`config`)
//! - **Runner**: tick loop with operator commands and abort conditions (`runner`)
//!
//! ## Numeric model
//!
//! Positions are `i64` microsteps. The gearing ratio and the fractional
//! carriage accumulator are `f64`; only whole steps ever reach the carriage.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod geometry;
pub mod hw_error;
pub mod layer;
pub mod mocks;
pub mod profile;
pub mod runner;
pub mod status;

pub use builder::ControllerBuilder;
pub use config::{DriveTrain, MotionCfg, MotorSpec, Pulleys};
pub use controller::WindingController;
pub use error::{AbortReason, BuildError, WinderError};
pub use layer::{Direction, Layer};
pub use profile::{LayerPlan, MAX_LAYERS, WindProfile};
pub use status::{Snapshot, WindingEvent, WindingState};

/// Controller over boxed collaborators, for callers that pick hardware at runtime.
pub type DynController = WindingController<
    Box<dyn winder_traits::Axis>,
    Box<dyn winder_traits::Axis>,
    Box<dyn winder_traits::HomeSensor>,
>;

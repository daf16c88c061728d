//! # Camera Module
//!
//! Perspective camera rig plus the damped orbit controller that drives it.
//!
//! - [`CameraRig`] - projection parameters and world pose
//! - [`OrbitController`] - rotate/zoom around a target under distance and polar limits
//! - [`InputEvent`] - host-independent pointer and wheel events

pub mod camera_rig;
pub mod input;
pub mod orbit_controller;

pub use camera_rig::CameraRig;
pub use input::{InputEvent, PointerButton};
pub use orbit_controller::{OrbitConstraints, OrbitController, Spherical};

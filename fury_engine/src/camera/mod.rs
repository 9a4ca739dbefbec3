//! Camera module - camera and frustum.
//!
//! Cameras are owned and driven by the caller and passed to the pipeline
//! per frame.

mod camera;
mod frustum;

pub use camera::Camera;
pub use frustum::{
    Frustum,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};

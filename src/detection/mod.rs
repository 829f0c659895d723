//! Detection module for smokewatch

mod result;

pub use result::{DetectionEvent, DetectionType, DetectionWindow};

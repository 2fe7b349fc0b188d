//! Controller layer: UI events, reducer-driven state transitions, and command orchestration.

pub mod events;
pub mod orchestration;

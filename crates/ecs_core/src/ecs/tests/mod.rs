//! Coordinator-level scenario tests

mod hierarchy_lifecycle;
mod scene_round_trip;

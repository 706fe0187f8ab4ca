//! System trait and per-frame context

use super::{Coordinator, EcsError};

/// Timing information handed to every system for one update
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameContext {
    /// Seconds since the previous update
    pub delta_time: f32,
    /// Seconds since the first update
    pub elapsed: f64,
    /// Index of the current update, starting at 0
    pub frame: u64,
}

impl FrameContext {
    /// Context for the first frame
    #[must_use]
    pub fn first(delta_time: f32) -> Self {
        Self {
            delta_time,
            elapsed: f64::from(delta_time),
            frame: 0,
        }
    }

    /// Context for the frame after this one
    #[must_use]
    pub fn next(&self, delta_time: f32) -> Self {
        Self {
            delta_time,
            elapsed: self.elapsed + f64::from(delta_time),
            frame: self.frame + 1,
        }
    }
}

/// Logic run once per [`Coordinator::update`]
pub trait System {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Run the system
    ///
    /// # Errors
    ///
    /// Any [`EcsError`] aborts the rest of the update.
    fn run(&mut self, coordinator: &mut Coordinator, context: &FrameContext) -> Result<(), EcsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_context_advances() {
        let first = FrameContext::first(0.5);
        let second = first.next(0.25);

        assert_eq!(first.frame, 0);
        assert_eq!(second.frame, 1);
        assert!((second.elapsed - 0.75).abs() < f64::EPSILON);
        assert!((second.delta_time - 0.25).abs() < f32::EPSILON);
    }
}

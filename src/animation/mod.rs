pub mod stepper;

pub use stepper::{FinishHandler, ProgressHandler, StepPhase, StepTrackController, StepTrackOptions};

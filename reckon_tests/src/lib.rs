/*! Shared harness for reckon integration tests. */

pub mod stepper;

pub mod prelude {
    pub use crate::stepper::SyncStepper;
    pub use reckon::prelude::*;
}

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    any::Any,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::{
    control::{ControlError, Odometer},
    params::OdometerParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared encoder step counter, incremented from the encoder's interrupt handler.
#[derive(Debug, Clone, Default)]
pub struct StepCounter(Arc<AtomicU64>);

/// Odometer counting the steps of a wheel encoder.
pub struct StepOdometer {
    counter: StepCounter,
    params: OdometerParams,

    /// Keeps the interrupt source registered for as long as the odometer lives.
    _source: Option<Box<dyn Any>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StepCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one step.
    pub fn step(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl StepOdometer {
    pub fn new(counter: StepCounter, params: OdometerParams) -> Self {
        Self {
            counter,
            params,
            _source: None,
        }
    }

    /// Tie the lifetime of the interrupt source to the odometer.
    pub fn with_source<S: Any>(mut self, source: S) -> Self {
        self._source = Some(Box::new(source));
        self
    }
}

impl Odometer for StepOdometer {
    fn reset(&mut self) -> Result<(), ControlError> {
        self.counter.reset();
        Ok(())
    }

    fn get_steps(&mut self) -> Result<i64, ControlError> {
        Ok(self.counter.get() as i64)
    }

    fn get_revolutions(&mut self) -> Result<f64, ControlError> {
        Ok(self.counter.get() as f64 / self.params.steps_per_revolution as f64)
    }

    fn get_distance(&mut self) -> Result<f64, ControlError> {
        Ok(self.counter.get() as f64 * self.params.step_distance_cm())
    }
}

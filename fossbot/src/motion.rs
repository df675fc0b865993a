//! # Motion controller
//!
//! Distance-bounded movement and angle-bounded rotation built on top of the motor and odometer
//! capabilities of a [`Backend`].
//!
//! Bounded motions run until **both** wheels reach their target, so the faster wheel keeps turning
//! until the slower one catches up. Movement polls the odometers without sleeping, rotation polls
//! every [`ROTATION_POLL_PERIOD`].
//!
//! The plain motions never give up on their own. A [`MotionGuard`] can bound them by a timeout
//! and/or a [`CancelToken`], in which case the motors are stopped before returning.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crate::{
    control::{Direction, Rotation},
    robot::{Backend, RobotError},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period between two step count samples during a rotation.
pub const ROTATION_POLL_PERIOD: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Thread safe flag requesting a running motion to end.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

/// Bounds on a motion.
#[derive(Debug, Clone)]
pub struct MotionGuard {
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
    on_expiry: Expiry,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What a motion reports when its guard's timeout elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// The motion fails with [`RobotError::Timeout`].
    Fail,

    /// The motion is considered complete.
    Complete,
}

/// Reason a guard ended a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardEnd {
    Cancelled,
    TimedOut,
    Completed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone of the token observes the request.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl MotionGuard {
    /// A guard which never ends a motion.
    pub fn unbounded() -> Self {
        Self {
            timeout: None,
            cancel: None,
            on_expiry: Expiry::Fail,
        }
    }

    /// A guard failing the motion once the timeout elapses.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::unbounded()
        }
    }

    /// A guard completing the motion once the window elapses.
    pub fn completing_after(window: Duration) -> Self {
        Self {
            timeout: Some(window),
            cancel: None,
            on_expiry: Expiry::Complete,
        }
    }

    /// Also end the motion when the token is cancelled.
    pub fn cancelled_by(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn on_expiry(&self) -> Expiry {
        self.on_expiry
    }

    fn check(&self, start: Instant) -> Option<GuardEnd> {
        if let Some(ref c) = self.cancel {
            if c.is_cancelled() {
                return Some(GuardEnd::Cancelled);
            }
        }

        match self.timeout {
            Some(t) if start.elapsed() >= t => match self.on_expiry {
                Expiry::Fail => Some(GuardEnd::TimedOut),
                Expiry::Complete => Some(GuardEnd::Completed),
            },
            _ => None,
        }
    }
}

impl Default for MotionGuard {
    fn default() -> Self {
        Self::unbounded()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Reset both odometers and start both motors in the given direction.
pub(crate) fn just_move<B: Backend + ?Sized>(
    backend: &mut B,
    direction: Direction,
) -> Result<(), RobotError> {
    backend.left_odometer().reset()?;
    backend.right_odometer().reset()?;
    backend.right_motor().start(direction)?;
    backend.left_motor().start(direction)?;

    debug!("Moving {}", direction);

    Ok(())
}

/// Move until both wheels have covered `dist` centimeters.
pub(crate) fn move_distance<B: Backend + ?Sized>(
    backend: &mut B,
    dist: f64,
    direction: Direction,
    guard: &MotionGuard,
) -> Result<(), RobotError> {
    if !dist.is_finite() || dist < 0.0 {
        return Err(RobotError::InvalidArgument(format!(
            "distance must be a finite non-negative number of centimeters, found {}",
            dist
        )));
    }
    if dist == 0.0 {
        return Ok(());
    }

    just_move(backend, direction)?;
    let start = Instant::now();

    let outcome = poll_until(backend, guard, start, None, |b| {
        let l = b.left_odometer().get_distance()?;
        let r = b.right_odometer().get_distance()?;
        trace!("Wheel distances {:.2} / {:.2} cm, target {:.2}", l, r, dist);
        Ok(l >= dist && r >= dist)
    });

    finish(backend, outcome)
}

/// Start both motors rotating the robot in place, without a bound.
pub(crate) fn just_rotate<B: Backend + ?Sized>(
    backend: &mut B,
    dir_id: i64,
) -> Result<Rotation, RobotError> {
    let rotation = Rotation::from_id(dir_id).ok_or_else(|| {
        RobotError::InvalidArgument(format!(
            "rotation id must be 0 (counterclockwise) or 1 (clockwise), found {}",
            dir_id
        ))
    })?;
    let (left_dir, right_dir) = rotation.wheel_directions();

    backend.left_odometer().reset()?;
    backend.right_odometer().reset()?;
    backend.left_motor().start(left_dir)?;
    backend.right_motor().start(right_dir)?;

    debug!("Rotating {:?}", rotation);

    Ok(rotation)
}

/// Rotate until both wheels exceed `steps` encoder steps.
pub(crate) fn rotate_90<B: Backend + ?Sized>(
    backend: &mut B,
    dir_id: i64,
    steps: i64,
    guard: &MotionGuard,
) -> Result<(), RobotError> {
    just_rotate(backend, dir_id)?;
    let start = Instant::now();

    let outcome = poll_until(backend, guard, start, Some(ROTATION_POLL_PERIOD), |b| {
        let l = b.left_odometer().get_steps()?;
        let r = b.right_odometer().get_steps()?;
        trace!("Wheel steps {} / {}, target {}", l, r, steps);
        Ok(l > steps && r > steps)
    });

    finish(backend, outcome)
}

/// Stop both motors and reset both odometers.
pub(crate) fn stop<B: Backend + ?Sized>(backend: &mut B) -> Result<(), RobotError> {
    backend.left_motor().stop()?;
    backend.right_motor().stop()?;
    backend.right_odometer().reset()?;
    backend.left_odometer().reset()?;

    Ok(())
}

/// Poll `done` until it returns true or the guard ends the motion.
fn poll_until<B, F>(
    backend: &mut B,
    guard: &MotionGuard,
    start: Instant,
    period: Option<Duration>,
    mut done: F,
) -> Result<Option<GuardEnd>, RobotError>
where
    B: Backend + ?Sized,
    F: FnMut(&mut B) -> Result<bool, RobotError>,
{
    loop {
        if done(backend)? {
            return Ok(None);
        }

        if let Some(end) = guard.check(start) {
            return Ok(Some(end));
        }

        if let Some(p) = period {
            thread::sleep(p);
        }
    }
}

/// Stop the motors at the end of a bounded motion and report its outcome.
fn finish<B: Backend + ?Sized>(
    backend: &mut B,
    outcome: Result<Option<GuardEnd>, RobotError>,
) -> Result<(), RobotError> {
    let stopped = stop(backend);

    match outcome {
        Ok(None) => stopped,
        Ok(Some(GuardEnd::Cancelled)) => {
            stopped?;
            warn!("Motion cancelled");
            Err(RobotError::Cancelled)
        }
        Ok(Some(GuardEnd::TimedOut)) => {
            stopped?;
            warn!("Motion timed out");
            Err(RobotError::Timeout)
        }
        Ok(Some(GuardEnd::Completed)) => {
            stopped?;
            debug!("Motion window elapsed, considering the motion complete");
            Ok(())
        }
        Err(e) => {
            if let Err(se) = stopped {
                warn!("Could not stop the motors after a failed motion: {}", se);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_guard_checks() {
        let start = Instant::now();
        assert_eq!(MotionGuard::unbounded().check(start), None);
        assert_eq!(
            MotionGuard::with_timeout(Duration::from_secs(0)).check(start),
            Some(GuardEnd::TimedOut)
        );
        assert_eq!(
            MotionGuard::completing_after(Duration::from_secs(0)).check(start),
            Some(GuardEnd::Completed)
        );

        let token = CancelToken::new();
        let guard = MotionGuard::with_timeout(Duration::from_secs(60)).cancelled_by(token.clone());
        assert_eq!(guard.check(start), None);
        token.cancel();
        assert_eq!(guard.check(start), Some(GuardEnd::Cancelled));
    }
}

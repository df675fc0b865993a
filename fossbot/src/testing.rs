//! Backend recording every actuator call, used to test the motion controller.

use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use crate::{
    control::{
        Accelerometer, Axis, Color, ControlError, Direction, Motor, MotorState, NoiseDetector,
        Odometer, RgbLed, UltrasonicSensor,
    },
    params::FloorSensorIds,
    robot::{Backend, BackendKind, RobotError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetSpeed(Side, u8),
    DirControl(Side, Direction),
    Start(Side, Direction),
    Stop(Side),
    Reset(Side),
    Led(Color),
    Sound(u32),
    Exit,
}

/// A wheel whose odometer advances by a fixed amount on every read while its motor runs.
#[derive(Debug)]
pub struct Wheel {
    pub state: MotorState,
    pub steps: i64,
    pub distance: f64,
    pub rate_cm: f64,
    pub rate_steps: i64,
    max_steps: i64,
    max_distance: f64,
}

#[derive(Debug)]
pub struct World {
    pub events: Vec<Event>,
    pub left: Wheel,
    pub right: Wheel,
    pub obstacle_cm: f64,
    pub light: f64,
    pub floor: [f64; 3],
    exited: bool,
}

pub struct FakeMotor {
    side: Side,
    world: Rc<RefCell<World>>,
}

pub struct FakeOdometer {
    side: Side,
    world: Rc<RefCell<World>>,
}

pub struct FakeSensors {
    world: Rc<RefCell<World>>,
}

pub struct RecordingBackend {
    world: Rc<RefCell<World>>,
    left_motor: FakeMotor,
    right_motor: FakeMotor,
    left_odometer: FakeOdometer,
    right_odometer: FakeOdometer,
    sensors: FakeSensors,
    floor_ids: FloorSensorIds,
}

impl Wheel {
    fn new(rate_cm: f64, rate_steps: i64) -> Self {
        Self {
            state: MotorState::stopped(0),
            steps: 0,
            distance: 0.0,
            rate_cm,
            rate_steps,
            max_steps: 0,
            max_distance: 0.0,
        }
    }
}

impl World {
    fn wheel_mut(&mut self, side: Side) -> &mut Wheel {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    fn wheel(&self, side: Side) -> &Wheel {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Number of recorded events matching the predicate.
    pub fn count<F: Fn(&Event) -> bool>(&self, f: F) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }

    /// Largest distance read from the wheel's odometer since the events were cleared.
    pub fn max_distance(&self, side: Side) -> f64 {
        self.wheel(side).max_distance
    }

    /// Largest step count read from the wheel's odometer since the events were cleared.
    pub fn max_steps(&self, side: Side) -> i64 {
        self.wheel(side).max_steps
    }
}

impl RecordingBackend {
    pub fn new(rate_cm: f64, rate_steps: i64) -> Self {
        let world = Rc::new(RefCell::new(World {
            events: Vec::new(),
            left: Wheel::new(rate_cm, rate_steps),
            right: Wheel::new(rate_cm, rate_steps),
            obstacle_cm: 100.0,
            light: 1.0,
            floor: [0.0; 3],
            exited: false,
        }));

        Self {
            left_motor: FakeMotor {
                side: Side::Left,
                world: world.clone(),
            },
            right_motor: FakeMotor {
                side: Side::Right,
                world: world.clone(),
            },
            left_odometer: FakeOdometer {
                side: Side::Left,
                world: world.clone(),
            },
            right_odometer: FakeOdometer {
                side: Side::Right,
                world: world.clone(),
            },
            sensors: FakeSensors {
                world: world.clone(),
            },
            world,
            floor_ids: FloorSensorIds::default(),
        }
    }

    pub fn world(&self) -> Ref<'_, World> {
        self.world.borrow()
    }

    pub fn clear_events(&self) {
        let mut w = self.world.borrow_mut();
        w.events.clear();
        for side in [Side::Left, Side::Right].iter() {
            let wheel = w.wheel_mut(*side);
            wheel.max_steps = 0;
            wheel.max_distance = 0.0;
        }
    }

    pub fn set_rates(&mut self, left_cm: f64, right_cm: f64) {
        let mut w = self.world.borrow_mut();
        w.left.rate_cm = left_cm;
        w.right.rate_cm = right_cm;
    }

    pub fn set_obstacle_distance(&mut self, cm: f64) {
        self.world.borrow_mut().obstacle_cm = cm;
    }

    pub fn set_light(&mut self, raw: f64) {
        self.world.borrow_mut().light = raw;
    }

    pub fn set_floor(&mut self, readings: [f64; 3]) {
        self.world.borrow_mut().floor = readings;
    }
}

impl Motor for FakeMotor {
    fn set_speed(&mut self, speed: u8) -> Result<(), ControlError> {
        let mut w = self.world.borrow_mut();
        w.wheel_mut(self.side).state.speed = speed;
        w.events.push(Event::SetSpeed(self.side, speed));
        Ok(())
    }

    fn dir_control(&mut self, direction: Direction) -> Result<(), ControlError> {
        let mut w = self.world.borrow_mut();
        w.wheel_mut(self.side).state.direction = direction;
        w.events.push(Event::DirControl(self.side, direction));
        Ok(())
    }

    fn start(&mut self, direction: Direction) -> Result<(), ControlError> {
        let mut w = self.world.borrow_mut();
        let wheel = w.wheel_mut(self.side);
        wheel.state.direction = direction;
        wheel.state.enabled = true;
        w.events.push(Event::Start(self.side, direction));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ControlError> {
        let mut w = self.world.borrow_mut();
        w.wheel_mut(self.side).state.enabled = false;
        w.events.push(Event::Stop(self.side));
        Ok(())
    }

    fn state(&self) -> MotorState {
        self.world.borrow().wheel(self.side).state
    }
}

impl Odometer for FakeOdometer {
    fn reset(&mut self) -> Result<(), ControlError> {
        let mut w = self.world.borrow_mut();
        let wheel = w.wheel_mut(self.side);
        wheel.steps = 0;
        wheel.distance = 0.0;
        w.events.push(Event::Reset(self.side));
        Ok(())
    }

    fn get_steps(&mut self) -> Result<i64, ControlError> {
        let mut w = self.world.borrow_mut();
        let wheel = w.wheel_mut(self.side);
        if wheel.state.enabled {
            wheel.steps += wheel.rate_steps;
        }
        wheel.max_steps = wheel.max_steps.max(wheel.steps);
        Ok(wheel.steps)
    }

    fn get_revolutions(&mut self) -> Result<f64, ControlError> {
        Ok(self.world.borrow().wheel(self.side).steps as f64 / 20.0)
    }

    fn get_distance(&mut self) -> Result<f64, ControlError> {
        let mut w = self.world.borrow_mut();
        let wheel = w.wheel_mut(self.side);
        if wheel.state.enabled {
            wheel.distance += wheel.rate_cm;
        }
        wheel.max_distance = wheel.max_distance.max(wheel.distance);
        Ok(wheel.distance)
    }
}

impl UltrasonicSensor for FakeSensors {
    fn get_distance(&mut self) -> Result<f64, ControlError> {
        Ok(self.world.borrow().obstacle_cm)
    }
}

impl Accelerometer for FakeSensors {
    fn get_acceleration(&mut self, axis: Axis) -> Result<f64, ControlError> {
        Ok(match axis {
            Axis::Z => 1.0,
            _ => 0.0,
        })
    }

    fn get_gyro(&mut self, _axis: Axis) -> Result<f64, ControlError> {
        Ok(0.0)
    }
}

impl RgbLed for FakeSensors {
    fn set_on(&mut self, color: Color) -> Result<(), ControlError> {
        self.world.borrow_mut().events.push(Event::Led(color));
        Ok(())
    }
}

impl NoiseDetector for FakeSensors {
    fn detect_noise(&mut self) -> Result<bool, ControlError> {
        Ok(false)
    }
}

impl Backend for RecordingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Dummy
    }

    fn left_motor(&mut self) -> &mut dyn Motor {
        &mut self.left_motor
    }

    fn right_motor(&mut self) -> &mut dyn Motor {
        &mut self.right_motor
    }

    fn left_odometer(&mut self) -> &mut dyn Odometer {
        &mut self.left_odometer
    }

    fn right_odometer(&mut self) -> &mut dyn Odometer {
        &mut self.right_odometer
    }

    fn ultrasonic(&mut self) -> &mut dyn UltrasonicSensor {
        &mut self.sensors
    }

    fn imu(&mut self) -> &mut dyn Accelerometer {
        &mut self.sensors
    }

    fn rgb_led(&mut self) -> &mut dyn RgbLed {
        &mut self.sensors
    }

    fn noise_detector(&mut self) -> &mut dyn NoiseDetector {
        &mut self.sensors
    }

    fn floor_sensor(&mut self, id: u8) -> Result<f64, RobotError> {
        match self.floor_ids.index_of(id) {
            Some(idx) => Ok(self.world.borrow().floor[idx]),
            None => Err(RobotError::InvalidArgument(format!(
                "no floor sensor with id {}",
                id
            ))),
        }
    }

    fn check_on_line(&mut self, id: u8) -> Result<bool, RobotError> {
        Ok(self.floor_sensor(id)? >= 0.5)
    }

    fn light_reading(&mut self) -> Result<f64, RobotError> {
        Ok(self.world.borrow().light)
    }

    fn play_sound(&mut self, id: u32) -> Result<(), RobotError> {
        self.world.borrow_mut().events.push(Event::Sound(id));
        Ok(())
    }

    fn exit(&mut self) -> Result<(), RobotError> {
        let mut w = self.world.borrow_mut();
        if !w.exited {
            w.exited = true;
            w.events.push(Event::Exit);
        }
        Ok(())
    }
}

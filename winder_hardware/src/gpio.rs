//! Raspberry Pi backends built on rppal.

use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::motion::{StepDir, StepPlanner};
use winder_traits::{Axis, HomeSensor};

/// Width of the STEP high pulse. Typical drivers want at least 1-2 µs.
const STEP_PULSE: Duration = Duration::from_micros(2);

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Step/dir driver (A4988, DRV8825, TMC in step mode) on three GPIO lines.
///
/// ENABLE is active low on all of these drivers; it is asserted on
/// construction and released on drop.
pub struct GpioAxis {
    step: OutputPin,
    dir: OutputPin,
    enable: Option<OutputPin>,
    planner: StepPlanner,
    epoch: Instant,
    last_dir: StepDir,
}

impl GpioAxis {
    pub fn new(step_pin: u8, dir_pin: u8, enable_pin: Option<u8>) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let mut step = gpio.get(step_pin).map_err(gpio_err)?.into_output();
        let dir = gpio.get(dir_pin).map_err(gpio_err)?.into_output();
        let enable = match enable_pin {
            Some(pin) => {
                let mut en = gpio.get(pin).map_err(gpio_err)?.into_output();
                en.set_low();
                Some(en)
            }
            None => None,
        };
        step.set_low(); // step idle low
        debug!(step_pin, dir_pin, ?enable_pin, "gpio axis ready");
        Ok(Self {
            step,
            dir,
            enable,
            planner: StepPlanner::new(),
            epoch: Instant::now(),
            last_dir: 0,
        })
    }

    fn pulse(&mut self, dir: StepDir) {
        if dir != self.last_dir {
            if dir > 0 {
                self.dir.set_high();
            } else {
                self.dir.set_low();
            }
            self.last_dir = dir;
        }
        self.step.set_high();
        spin_for(STEP_PULSE);
        self.step.set_low();
    }

    fn now_s(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

impl Drop for GpioAxis {
    fn drop(&mut self) {
        if let Some(en) = self.enable.as_mut() {
            en.set_high();
        }
    }
}

/// Busy-wait; `thread::sleep` cannot resolve a couple of microseconds.
#[inline]
fn spin_for(d: Duration) {
    let start = Instant::now();
    while start.elapsed() < d {
        std::hint::spin_loop();
    }
}

fn finite(v: f64, what: &'static str) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HwError::InvalidParameter(what))
    }
}

impl Axis for GpioAxis {
    fn set_max_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner
            .set_max_speed(finite(steps_per_sec, "max speed must be finite")?);
        Ok(())
    }

    fn set_acceleration(
        &mut self,
        steps_per_sec2: f64,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner
            .set_acceleration(finite(steps_per_sec2, "acceleration must be finite")?);
        Ok(())
    }

    fn set_speed(
        &mut self,
        steps_per_sec: f64,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner
            .set_speed(finite(steps_per_sec, "speed must be finite")?);
        Ok(())
    }

    fn run_speed(&mut self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.now_s();
        match self.planner.poll_speed(now) {
            Some(dir) => {
                self.pulse(dir);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn move_relative(
        &mut self,
        steps: i64,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner.move_relative(steps);
        Ok(())
    }

    fn run(&mut self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.now_s();
        match self.planner.poll_position(now) {
            Some(dir) => {
                self.pulse(dir);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn current_position(&self) -> i64 {
        self.planner.position()
    }

    fn set_current_position(
        &mut self,
        position: i64,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner.set_current_position(position);
        Ok(())
    }

    fn stop(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.planner.stop();
        Ok(())
    }
}

/// Mechanical limit switch on a GPIO input.
pub struct GpioHomeSwitch {
    pin: InputPin,
    active_low: bool,
}

impl GpioHomeSwitch {
    /// With `active_low` the input gets the internal pull-up and the switch
    /// shorts it to ground; otherwise a pull-down is used.
    pub fn new(pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let p = gpio.get(pin).map_err(gpio_err)?;
        let pin_in = if active_low {
            p.into_input_pullup()
        } else {
            p.into_input_pulldown()
        };
        debug!(pin, active_low, "home switch ready");
        Ok(Self {
            pin: pin_in,
            active_low,
        })
    }
}

impl HomeSensor for GpioHomeSwitch {
    fn is_home(&mut self) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let hit = self.pin.is_low() == self.active_low;
        if hit {
            trace!("home switch asserted");
        }
        Ok(hit)
    }
}

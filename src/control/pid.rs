//! Discrete-time PID controller for heading stabilization.
//!
//! Drives measured yaw toward a setpoint with rectangular integration and a
//! measured (not assumed) dt, because wall-clock ticks drift under I/O
//! latency. Only the final output is clamped; the integral itself is not,
//! which leaves a latent windup risk if error persists without output effect.

use crate::config::ControlConfig;

/// Fixed-gain PID over a single controlled variable. Constructed per
/// stabilization episode; the integral starts at zero each time.
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    setpoint: f64,
    output_min: f64,
    output_max: f64,
    threshold: f64,
    integral: f64,
    previous_error: f64,
    last_error: Option<f64>,
}

impl PidController {
    pub fn new(config: &ControlConfig, setpoint: f64) -> Self {
        Self {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
            setpoint,
            output_min: config.output_min,
            output_max: config.output_max,
            threshold: config.threshold,
            integral: 0.0,
            previous_error: 0.0,
            last_error: None,
        }
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    /// Advance the controller by one measured sample and return the clamped
    /// control output.
    pub fn step(&mut self, measured: f64, dt: f64) -> f64 {
        let error = self.setpoint - measured;

        self.integral += error * dt;

        let derivative = if dt > 0.0 {
            (error - self.previous_error) / dt
        } else {
            0.0
        };

        let output = self.kp * error + self.ki * self.integral + self.kd * derivative;
        let output = output.clamp(self.output_min, self.output_max);

        self.previous_error = error;
        self.last_error = Some(error);

        output
    }

    /// True once the most recent error is within the threshold. False before
    /// the first step.
    pub fn converged(&self) -> bool {
        match self.last_error {
            Some(error) => error.abs() < self.threshold,
            None => false,
        }
    }

    /// Most recent error, if the controller has stepped at least once.
    pub fn last_error(&self) -> Option<f64> {
        self.last_error
    }
}

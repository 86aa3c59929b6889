//! Per-agent choreography state machine.
//!
//! Sequences the triangle formation: a role-specific approach translation,
//! a settle delay, a wall-clock-gated dance, then heading restoration and a
//! mirrored retreat. Deadlines are absolute offsets from sequence start,
//! computed on the agent's local clock; synchronization precision across
//! agents is bounded by clock skew and delivery jitter.

use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::agent::AgentContext;
use crate::config::{ChoreographyConfig, ControlConfig};
use crate::control::PidController;
use crate::domain::{dispatch, ActuationCommand, Actuator, Maneuver, Phase};
use crate::error::{Result, StrutError};
use crate::choreography::RoleProfile;

/// Drives one agent through the triangle sequence. Constructed per sequence;
/// the phase trace is kept for diagnostics.
pub struct Orchestrator {
    choreography: ChoreographyConfig,
    control: ControlConfig,
    role: RoleProfile,
    phase: Phase,
    trace: Vec<Phase>,
}

impl Orchestrator {
    pub fn new(
        choreography: ChoreographyConfig,
        control: ControlConfig,
        role: RoleProfile,
    ) -> Self {
        Self {
            choreography,
            control,
            role,
            phase: Phase::Idle,
            trace: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phases entered so far, in order.
    pub fn trace(&self) -> &[Phase] {
        &self.trace
    }

    /// Run the full sequence to completion. A timed phase always runs to its
    /// deadline; there is no mid-phase abort. On channel or actuator failure
    /// the last command stays latched for the external watchdog to clear.
    pub async fn run<A: Actuator>(&mut self, ctx: &mut AgentContext<A>) -> Result<()> {
        let start = Instant::now();
        let perform_deadline = start + Duration::from_millis(self.choreography.perform_offset_ms);
        let realign_deadline =
            perform_deadline + Duration::from_millis(self.choreography.realign_offset_ms);

        // Enter the walk stance and record the heading the realign passes
        // will restore.
        ctx.apply(ActuationCommand::walk([0.0, 0.0])).await?;
        let setpoint = ctx.read_yaw().await?;
        info!(id = ctx.id(), setpoint, "Starting triangle sequence");

        self.enter(Phase::Approach)?;
        ctx.set_command(ActuationCommand::walk(self.role.approach_velocity));
        self.drive_for(ctx, Duration::from_secs_f64(self.choreography.approach_secs))
            .await?;

        // Let movement inertia decay before holding position
        sleep(Duration::from_secs_f64(self.choreography.settle_secs)).await;

        self.enter(Phase::Hold)?;
        self.wait_until(perform_deadline).await;

        self.enter(Phase::Perform)?;
        ctx.apply(dispatch(&Maneuver::DanceOne)).await?;
        self.wait_until(realign_deadline).await;

        self.enter(Phase::RealignOut)?;
        ctx.apply(ActuationCommand::walk([0.0, 0.0])).await?;
        self.stabilize(ctx, setpoint).await?;

        ctx.set_command(ActuationCommand::walk(self.role.retreat_velocity()));
        self.drive_for(ctx, Duration::from_secs_f64(self.choreography.approach_secs))
            .await?;
        self.stabilize(ctx, setpoint).await?;

        self.enter(Phase::Idle)?;
        info!(id = ctx.id(), "Triangle sequence complete");
        Ok(())
    }

    fn enter(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(StrutError::InvalidPhaseTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        info!(from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        self.trace.push(next);
        Ok(())
    }

    /// Re-send the latched command at the tick interval for the duration.
    async fn drive_for<A: Actuator>(
        &self,
        ctx: &mut AgentContext<A>,
        duration: Duration,
    ) -> Result<()> {
        let tick = Duration::from_millis(self.choreography.tick_ms);
        let end = Instant::now() + duration;
        while Instant::now() < end {
            ctx.send().await?;
            sleep(tick).await;
        }
        Ok(())
    }

    /// Suspend in tick increments until the absolute deadline has passed.
    async fn wait_until(&self, deadline: Instant) {
        let tick = Duration::from_millis(self.choreography.tick_ms);
        while Instant::now() < deadline {
            sleep(tick).await;
        }
    }

    /// One stabilization episode: PID on yaw until convergence, in-place
    /// rotation only. Exhausting the wall-clock budget reports
    /// [`StrutError::ConvergenceTimeout`].
    async fn stabilize<A: Actuator>(
        &self,
        ctx: &mut AgentContext<A>,
        setpoint: f64,
    ) -> Result<()> {
        let mut pid = PidController::new(&self.control, setpoint);
        let tick = Duration::from_millis(self.control.tick_ms);
        let budget = Duration::from_millis(self.control.convergence_budget_ms);
        let started = Instant::now();
        let mut previous_tick = started;

        loop {
            sleep(tick).await;
            let now = Instant::now();
            let dt = now.duration_since(previous_tick).as_secs_f64();
            previous_tick = now;

            let yaw = ctx.read_yaw().await?;
            let output = pid.step(yaw, dt);

            if pid.converged() {
                debug!(id = ctx.id(), yaw, "Aligned to setpoint");
                ctx.apply(ActuationCommand::spin(0.0)).await?;
                return Ok(());
            }

            debug!(id = ctx.id(), yaw, output, "Stabilizing heading");
            ctx.apply(ActuationCommand::spin(output as f32)).await?;

            if started.elapsed() >= budget {
                warn!(id = ctx.id(), "Stabilization budget exhausted");
                return Err(StrutError::ConvergenceTimeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        }
    }
}

//! Reflection-angle grid search.
//!
//! Walks candidate outgoing directions over a theta x phi grid. Each cell
//! commands a fresh 1-bit profile, waits for the surface to settle, then reads
//! the companion power meter. The grid is coarse on purpose: every cell costs
//! a live hardware measurement, so a fast exhaustive pass beats adaptive
//! optimization here.

use std::cmp::Ordering;
use std::sync::{
    atomic::{AtomicBool, Ordering as AtomicOrdering},
    Arc,
};
use std::thread;

use log::{debug, info, warn};

use crate::pattern::{ArrayGeometry, DirectionAngle, PhaseProfile};
use crate::types::{Error, Result, SweepConfig};

/// Pushes a phase profile to an initialized RIS device handle.
pub trait PatternSink {
    /// Commands `profile` onto the surface.
    ///
    /// A failure skips the current candidate only; the sweep continues.
    fn send_pattern(&mut self, profile: &PhaseProfile) -> Result<()>;
}

/// Reads back received power from the companion meter.
pub trait PowerMeter {
    /// Requests one reading for the currently commanded `outgoing` direction,
    /// in dBm.
    ///
    /// Timeouts and decode failures drop the current sample only; the sweep
    /// continues.
    fn measure(&mut self, outgoing: DirectionAngle) -> Result<f64>;
}

/// Operator cancellation signal, checked at grid-cell boundaries only so the
/// surface is never left in a half-applied state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests early termination at the next cell boundary.
    pub fn cancel(&self) {
        self.flag.store(true, AtomicOrdering::Relaxed);
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(AtomicOrdering::Relaxed)
    }
}

/// One measured grid cell: the candidate outgoing direction and the power the
/// meter reported for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSample {
    /// Candidate outgoing direction, in degrees.
    pub outgoing: DirectionAngle,
    /// Measured return power in dBm.
    pub power_dbm: f64,
}

/// Outcome of a sweep: every collected sample in measurement order, plus the
/// top-K ranked by descending power.
#[derive(Debug, Clone)]
pub struct SweepResult {
    samples: Vec<MeasurementSample>,
    ranked: Vec<MeasurementSample>,
    cancelled: bool,
}

impl SweepResult {
    /// Ranks `samples` and keeps the best `top_k`.
    ///
    /// The sort is stable on descending power, so equal powers keep their
    /// sweep order and the earlier-measured candidate ranks higher.
    pub fn from_samples(samples: Vec<MeasurementSample>, top_k: usize, cancelled: bool) -> Self {
        let mut ranked = samples.clone();
        ranked.sort_by(|a, b| {
            b.power_dbm
                .partial_cmp(&a.power_dbm)
                .unwrap_or(Ordering::Equal)
        });
        ranked.truncate(top_k);
        Self {
            samples,
            ranked,
            cancelled,
        }
    }

    /// Every collected sample, in the order it was measured.
    pub fn samples(&self) -> &[MeasurementSample] {
        &self.samples
    }

    /// The top-K samples by descending power, earlier-measured first on ties.
    pub fn top(&self) -> &[MeasurementSample] {
        &self.ranked
    }

    /// The single best sample, if any was collected.
    pub fn best(&self) -> Option<&MeasurementSample> {
        self.ranked.first()
    }

    /// True if the sweep ended early on operator cancellation.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Runs a full reflection sweep, strictly sequentially.
///
/// Per cell: compute profile, send it, settle, measure, record. Send failures
/// and measurement timeouts/garbage are logged and cost only that cell.
/// Cancellation between cells returns the partial result collected so far.
///
/// Fatal precondition errors (bad wavelength, out-of-range incident angles)
/// are returned before any collaborator is touched.
pub fn run_sweep(
    geometry: &ArrayGeometry,
    wavelength_m: f64,
    incident: DirectionAngle,
    config: &SweepConfig,
    sink: &mut dyn PatternSink,
    meter: &mut dyn PowerMeter,
    cancel: &CancelToken,
) -> Result<SweepResult> {
    if !wavelength_m.is_finite() || wavelength_m <= 0.0 {
        return Err(Error::Argument("wavelength must be positive"));
    }
    incident.validate_incident()?;

    let cells = config.theta.len() * config.phi.len();
    info!(
        "Sweeping {} x {} reflection grid ({cells} cells) for incident {incident}",
        config.theta.len(),
        config.phi.len(),
    );

    let mut samples = Vec::new();
    let mut cancelled = false;

    'grid: for theta_out in config.theta.iter() {
        for phi_out in config.phi.iter() {
            if cancel.is_cancelled() {
                cancelled = true;
                break 'grid;
            }

            let outgoing = DirectionAngle::new(theta_out, phi_out);
            let profile = PhaseProfile::compute(geometry, wavelength_m, incident, outgoing)?;

            if let Err(e) = sink.send_pattern(&profile) {
                warn!("Skipping {outgoing}: pattern send failed: {e}");
                continue;
            }
            debug!("Pattern applied for {outgoing}");

            // The surface must reach the commanded state before the meter
            // reading is valid.
            thread::sleep(config.settle);

            match meter.measure(outgoing) {
                Ok(power_dbm) => {
                    info!("Received power {power_dbm} dBm at {outgoing}");
                    samples.push(MeasurementSample {
                        outgoing,
                        power_dbm,
                    });
                }
                Err(Error::MeasurementTimeout) => {
                    warn!("Dropping sample at {outgoing}: meter timed out");
                }
                Err(Error::MeasurementDecode(msg)) => {
                    warn!("Dropping sample at {outgoing}: {msg}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    if cancelled {
        info!(
            "Sweep cancelled after {} of {cells} cells, ranking partial result",
            samples.len()
        );
    }
    Ok(SweepResult::from_samples(samples, config.top_k, cancelled))
}

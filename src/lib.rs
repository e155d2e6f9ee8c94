#![deny(unsafe_code)]

//! # RIS reflection sweep
//!
//! This crate finds the reflection direction of a reconfigurable intelligent
//! surface (RIS) that maximizes received power. Given the array geometry and
//! an incident-wave direction, it computes the 1-bit phase profile for every
//! candidate outgoing direction on a configurable grid, commands each profile
//! to the device, reads back a live power measurement from a companion meter,
//! and ranks the candidates.
//!
//! The device link and the meter link are both behind traits
//! ([`PatternSink`], [`PowerMeter`]): the vendor driver owns the wire
//! protocol, this crate owns the physics and the sweep discipline.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use anyhow::Result;
//! use ris_sweep::{
//!     ArrayGeometry, CancelToken, DirectionAngle, PatternSink, PhaseProfile, RisSession,
//!     SocketMeter, SweepConfig,
//! };
//!
//! struct Driver; // your initialized vendor device handle
//!
//! impl PatternSink for Driver {
//!     fn send_pattern(&mut self, profile: &PhaseProfile) -> ris_sweep::Result<()> {
//!         // push profile.bits() through the vendor driver
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let wavelength_m = 3.0e8 / 28.0e9;
//!     let geometry = ArrayGeometry::new(32, 32, wavelength_m / 2.0)?;
//!     let session = RisSession::new("RIS-0001", geometry, wavelength_m)?;
//!
//!     let mut driver = Driver;
//!     let mut meter = SocketMeter::connect("192.168.100.7:5003", Duration::from_millis(1500))?;
//!
//!     let result = session.run_sweep(
//!         DirectionAngle::new(30.0, 0.0),
//!         &SweepConfig::reference(),
//!         &mut driver,
//!         &mut meter,
//!         &CancelToken::new(),
//!     )?;
//!
//!     for (i, sample) in result.top().iter().enumerate() {
//!         println!("#{}: {} -> {} dBm", i + 1, sample.outgoing, sample.power_dbm);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg), feature(doc_auto_cfg))]
#![warn(missing_docs)]

mod meter;
mod pattern;
mod registry;
mod sweep;
mod types;

pub use meter::SocketMeter;
pub use pattern::{ArrayGeometry, DirectionAngle, PhaseProfile};
pub use registry::{OpRegistry, OpValue};
pub use sweep::{
    run_sweep, CancelToken, MeasurementSample, PatternSink, PowerMeter, SweepResult,
};
pub use types::*;

use std::collections::VecDeque;
use std::sync::Mutex;

/// How many recent samples a session keeps for live displays.
const RECENT_SAMPLE_CAP: usize = 500;

/// One active RIS device session.
///
/// Owns the array description and the session state: only one sweep may hold
/// the device and meter channels at a time, and a bounded buffer of the most
/// recent samples is kept for live displays. There is no process-wide
/// state; every operation goes through a session.
pub struct RisSession {
    sn: String,
    geometry: ArrayGeometry,
    wavelength_m: f64,
    /// Synchronized state.
    /// One sweep at a time; the rolling sample buffer trails the newest sweep.
    inner: Mutex<Inner>,
}

struct Inner {
    mode: Mode,
    recent: VecDeque<MeasurementSample>,
}

impl Inner {
    fn ensure_mode(&self, expected: Mode) -> Result<()> {
        let actual = self.mode;
        if actual != expected {
            return Err(Error::WrongMode {
                required: expected,
                actual,
            });
        }
        Ok(())
    }
}

impl RisSession {
    /// Creates a session for an already-initialized device.
    ///
    /// `sn` is the device serial as reported by the vendor driver; geometry
    /// and wavelength describe the surface it controls.
    pub fn new(sn: impl Into<String>, geometry: ArrayGeometry, wavelength_m: f64) -> Result<Self> {
        if !wavelength_m.is_finite() || wavelength_m <= 0.0 {
            return Err(Error::Argument("wavelength must be positive"));
        }
        Ok(Self {
            sn: sn.into(),
            geometry,
            wavelength_m,
            inner: Mutex::new(Inner {
                mode: Mode::Idle,
                recent: VecDeque::new(),
            }),
        })
    }

    /// Device serial number.
    pub fn sn(&self) -> &str {
        &self.sn
    }

    /// The surface geometry this session controls.
    pub fn geometry(&self) -> &ArrayGeometry {
        &self.geometry
    }

    /// Carrier wavelength in meters.
    pub fn wavelength_m(&self) -> f64 {
        self.wavelength_m
    }

    /// Current session mode.
    pub fn mode(&self) -> Mode {
        self.inner.lock().unwrap().mode
    }

    /// The most recent samples, oldest first, capped at 500.
    pub fn recent_samples(&self) -> Vec<MeasurementSample> {
        self.inner.lock().unwrap().recent.iter().copied().collect()
    }

    /// Runs a reflection sweep on this session's device.
    ///
    /// # Errors
    /// Returns [`Error::WrongMode`] if a sweep is already in progress, or a
    /// fatal precondition error before any collaborator is touched.
    /// Per-candidate send/measure failures are logged and skipped, and
    /// operator cancellation still yields an `Ok` partial result.
    pub fn run_sweep(
        &self,
        incident: DirectionAngle,
        config: &SweepConfig,
        sink: &mut dyn PatternSink,
        meter: &mut dyn PowerMeter,
        cancel: &CancelToken,
    ) -> Result<SweepResult> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.ensure_mode(Mode::Idle)?;
            inner.mode = Mode::Sweeping;
        }

        let result = sweep::run_sweep(
            &self.geometry,
            self.wavelength_m,
            incident,
            config,
            sink,
            meter,
            cancel,
        );

        let mut inner = self.inner.lock().unwrap();
        inner.mode = Mode::Idle;
        if let Ok(result) = &result {
            inner.recent.extend(result.samples().iter().copied());
            while inner.recent.len() > RECENT_SAMPLE_CAP {
                inner.recent.pop_front();
            }
        }

        result
    }
}

use std::time::Duration;

/// Session states of a RIS device handle.
///
/// The surface is half duplex in practice: while a sweep is walking the
/// reflection grid, no other caller may push patterns or read the meter.
#[atomic_enum::atomic_enum]
#[derive(PartialEq)]
#[repr(u16)]
pub enum Mode {
    /// No sweep in progress.
    Idle = 0,
    /// A reflection sweep owns the device and meter channels.
    Sweeping = 1,
}

bitflags::bitflags! {
    /// Connection interfaces a device may be reachable over.
    ///
    /// Combinable: `DevInterface::LAN | DevInterface::COMPORT` scans both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DevInterface: u8 {
        /// Ethernet / UDP discovery.
        const LAN = 1 << 0;
        /// Serial COM port.
        const COMPORT = 1 << 1;
        /// USB.
        const USB = 1 << 2;
        /// Every supported interface.
        const ALL = Self::LAN.bits() | Self::COMPORT.bits() | Self::USB.bits();
    }
}

/// A half-open `[start, stop)` range of angles in degrees, walked in `step`
/// increments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRange {
    /// First angle in degrees, inclusive.
    pub start_deg: f64,
    /// Last angle in degrees, exclusive.
    pub stop_deg: f64,
    /// Increment in degrees. Must be positive.
    pub step_deg: f64,
}

impl GridRange {
    /// Builds a range after validating `step > 0` and `stop > start`.
    pub fn new(start_deg: f64, stop_deg: f64, step_deg: f64) -> Result<Self> {
        if !step_deg.is_finite() || step_deg <= 0.0 {
            return Err(Error::Argument("grid step must be positive"));
        }
        if !(start_deg.is_finite() && stop_deg.is_finite()) || stop_deg <= start_deg {
            return Err(Error::Argument("grid stop must be greater than start"));
        }
        Ok(Self {
            start_deg,
            stop_deg,
            step_deg,
        })
    }

    /// Number of grid points in the range.
    pub fn len(&self) -> usize {
        ((self.stop_deg - self.start_deg) / self.step_deg).ceil() as usize
    }

    /// Returns true if the range contains no grid points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the grid points in degrees.
    ///
    /// Points are computed by index from `start` so long sweeps do not
    /// accumulate floating-point drift.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let start = self.start_deg;
        let step = self.step_deg;
        (0..self.len()).map(move |i| start + i as f64 * step)
    }
}

/// Parameters of one reflection sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Outgoing elevation grid.
    pub theta: GridRange,
    /// Outgoing azimuth grid.
    pub phi: GridRange,
    /// Delay between commanding a pattern and reading the meter, so the
    /// surface settles into the commanded state. Never skipped.
    pub settle: Duration,
    /// How many ranked samples to report.
    pub top_k: usize,
}

impl SweepConfig {
    /// The reference sweep: elevation `[0, 180)` every 1 degree, azimuth
    /// `[0, 360)` every 10 degrees, 1 second settle, top 3 reported.
    pub fn reference() -> Self {
        Self {
            theta: GridRange {
                start_deg: 0.0,
                stop_deg: 180.0,
                step_deg: 1.0,
            },
            phi: GridRange {
                start_deg: 0.0,
                stop_deg: 360.0,
                step_deg: 10.0,
            },
            settle: Duration::from_secs(1),
            top_k: 3,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::reference()
    }
}

/// RIS sweep errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O error occurred.
    #[error("io")]
    Io(#[from] std::io::Error),
    /// Array dimensions or spacing are unusable. Fatal, rejected before any
    /// hardware interaction.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
    /// Invalid argument provided.
    #[error("{0}")]
    Argument(&'static str),
    /// The device rejected a commanded pattern. Non-fatal per candidate.
    #[error("pattern send failed: {0}")]
    PatternSend(String),
    /// The meter did not answer within its read timeout.
    #[error("measurement timed out")]
    MeasurementTimeout,
    /// The meter answered with something that is not a power reading.
    #[error("measurement decode failed: {0}")]
    MeasurementDecode(String),
    /// Session is in the wrong mode for this operation.
    #[error("session in invalid mode. Required: {required:?}, actual: {actual:?}")]
    WrongMode {
        /// The mode required for this operation.
        required: Mode,
        /// The actual mode of the session which differs from `required`.
        actual: Mode,
    },
    /// No operation registered under this name.
    #[error("unknown operation: {0}()")]
    UnknownOperation(String),
    /// A dotted enum reference string did not name a known type or variant.
    #[error("enum reference parse failed: {0}")]
    EnumParse(String),
}

/// Result type for operations that may return an `Error`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn interface_flags_combine() {
        let wired = DevInterface::LAN | DevInterface::COMPORT;
        assert!(wired.contains(DevInterface::LAN));
        assert!(!wired.contains(DevInterface::USB));
        assert_eq!(wired & DevInterface::USB, DevInterface::empty());
        assert_eq!(wired | DevInterface::USB, DevInterface::ALL);
        assert_eq!(DevInterface::ALL & DevInterface::COMPORT, DevInterface::COMPORT);
    }

    #[test]
    fn reference_grid_sizes() {
        let cfg = SweepConfig::reference();
        assert_eq!(cfg.theta.len(), 180);
        assert_eq!(cfg.phi.len(), 36);
        assert_eq!(cfg.top_k, 3);
    }

    #[test]
    fn grid_range_iterates_half_open() {
        let r = GridRange::new(0.0, 360.0, 10.0).unwrap();
        let points: Vec<f64> = r.iter().collect();
        assert_eq!(points.len(), 36);
        assert_eq!(points[0], 0.0);
        assert_eq!(points[35], 350.0);

        let r = GridRange::new(0.0, 5.0, 2.0).unwrap();
        let points: Vec<f64> = r.iter().collect();
        assert_eq!(points, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn grid_range_rejects_bad_bounds() {
        assert!(GridRange::new(0.0, 180.0, 0.0).is_err());
        assert!(GridRange::new(0.0, 180.0, -1.0).is_err());
        assert!(GridRange::new(90.0, 90.0, 1.0).is_err());
        assert!(GridRange::new(180.0, 0.0, 1.0).is_err());
    }
}

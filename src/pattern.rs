//! Array geometry and the reflect-array phase law.
//!
//! A reconfigurable surface steers an incident wave by programming a
//! per-element phase offset. With 1-bit elements the continuous profile is
//! thresholded at pi, which costs a few dB of pointing gain but keeps the
//! control path a plain bit matrix.

use std::f64::consts::PI;

use crate::{Error, Result};

/// A (theta, phi) direction in degrees.
///
/// Values stay in degrees everywhere they are stored or reported; conversion
/// to radians happens only inside the trigonometric computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionAngle {
    /// Elevation in degrees.
    pub theta_deg: f64,
    /// Azimuth in degrees.
    pub phi_deg: f64,
}

impl DirectionAngle {
    /// Builds a direction from elevation and azimuth in degrees.
    pub fn new(theta_deg: f64, phi_deg: f64) -> Self {
        Self { theta_deg, phi_deg }
    }

    /// Validates the incident-wave bounds: theta in `[0, 180]`, phi in
    /// `[-180, 180]`.
    pub fn validate_incident(&self) -> Result<()> {
        if !(0.0..=180.0).contains(&self.theta_deg) {
            return Err(Error::Argument(
                "incident theta must be between 0 and 180 degrees",
            ));
        }
        if !(-180.0..=180.0).contains(&self.phi_deg) {
            return Err(Error::Argument(
                "incident phi must be between -180 and 180 degrees",
            ));
        }
        Ok(())
    }

    fn to_radians(self) -> (f64, f64) {
        (self.theta_deg.to_radians(), self.phi_deg.to_radians())
    }
}

impl std::fmt::Display for DirectionAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(theta={}, phi={})", self.theta_deg, self.phi_deg)
    }
}

/// Planar antenna array: element counts along two axes and a uniform
/// element spacing, typically half the carrier wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayGeometry {
    rows: usize,
    cols: usize,
    spacing_m: f64,
    /// Row-major (x, y) element coordinates, centered on the centroid.
    positions: Vec<(f64, f64)>,
}

impl ArrayGeometry {
    /// Builds the geometry and its element grid.
    ///
    /// Element `(i, j)` sits at `x = (j - (cols-1)/2) * spacing`,
    /// `y = (i - (rows-1)/2) * spacing`, so the array centroid is the origin.
    pub fn new(rows: usize, cols: usize, spacing_m: f64) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidGeometry("element counts must be at least 1"));
        }
        if !spacing_m.is_finite() || spacing_m <= 0.0 {
            return Err(Error::InvalidGeometry("element spacing must be positive"));
        }

        let x_off = (cols - 1) as f64 / 2.0;
        let y_off = (rows - 1) as f64 / 2.0;
        let mut positions = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            let y = (i as f64 - y_off) * spacing_m;
            for j in 0..cols {
                let x = (j as f64 - x_off) * spacing_m;
                positions.push((x, y));
            }
        }

        Ok(Self {
            rows,
            cols,
            spacing_m,
            positions,
        })
    }

    /// Element rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Element columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element spacing in meters.
    pub fn spacing_m(&self) -> f64 {
        self.spacing_m
    }

    /// Row-major element coordinates in meters, centered on the centroid.
    pub fn positions(&self) -> &[(f64, f64)] {
        &self.positions
    }
}

/// Per-element 1-bit phase states for one candidate reflection direction.
///
/// Computed fresh per candidate, pushed to the device, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseProfile {
    rows: usize,
    cols: usize,
    /// Row-major bits, each 0 or 1.
    bits: Vec<u8>,
}

impl PhaseProfile {
    /// Computes the 1-bit profile steering `incident` into `outgoing`.
    ///
    /// Direction-cosine deltas between the incident and outgoing unit vectors
    /// give the required phase gradient; each element's phase is reduced into
    /// `[0, 2pi)` and thresholded at pi.
    pub fn compute(
        geometry: &ArrayGeometry,
        wavelength_m: f64,
        incident: DirectionAngle,
        outgoing: DirectionAngle,
    ) -> Result<Self> {
        let phases = raw_phases(geometry, wavelength_m, incident, outgoing)?;
        let bits = phases.iter().map(|&p| u8::from(p >= PI)).collect();
        Ok(Self {
            rows: geometry.rows(),
            cols: geometry.cols(),
            bits,
        })
    }

    /// Profile rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Profile columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major bits, each 0 or 1.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// The bit commanded to element `(row, col)`.
    pub fn bit(&self, row: usize, col: usize) -> u8 {
        self.bits[row * self.cols + col]
    }
}

/// Modulo-reduced per-element phases in `[0, 2pi)`, row-major, before
/// quantization.
pub(crate) fn raw_phases(
    geometry: &ArrayGeometry,
    wavelength_m: f64,
    incident: DirectionAngle,
    outgoing: DirectionAngle,
) -> Result<Vec<f64>> {
    if !wavelength_m.is_finite() || wavelength_m <= 0.0 {
        return Err(Error::Argument("wavelength must be positive"));
    }

    let (theta_in, phi_in) = incident.to_radians();
    let (theta_out, phi_out) = outgoing.to_radians();

    // Direction-cosine deltas, incident minus outgoing.
    let delta_x = theta_in.sin() * phi_in.cos() - theta_out.sin() * phi_out.cos();
    let delta_y = theta_in.sin() * phi_in.sin() - theta_out.sin() * phi_out.sin();

    let k = -2.0 * PI / wavelength_m;
    Ok(geometry
        .positions()
        .iter()
        .map(|&(x, y)| (k * (delta_x * x + delta_y * y)).rem_euclid(2.0 * PI))
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    // 28 GHz carrier, the reference RIS operating point.
    const WAVELENGTH_28GHZ: f64 = 3.0e8 / 28.0e9;

    fn half_wave_geometry(rows: usize, cols: usize) -> ArrayGeometry {
        ArrayGeometry::new(rows, cols, WAVELENGTH_28GHZ / 2.0).unwrap()
    }

    #[test]
    fn rejects_degenerate_geometry() {
        assert!(matches!(
            ArrayGeometry::new(0, 4, 0.005),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            ArrayGeometry::new(4, 0, 0.005),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            ArrayGeometry::new(4, 4, 0.0),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            ArrayGeometry::new(4, 4, -0.005),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn positions_are_centered() {
        for &(rows, cols) in &[(1, 1), (2, 3), (4, 4), (5, 8), (32, 32)] {
            let g = ArrayGeometry::new(rows, cols, 0.005).unwrap();
            assert_eq!(g.positions().len(), rows * cols);

            let n = g.positions().len() as f64;
            let mean_x: f64 = g.positions().iter().map(|p| p.0).sum::<f64>() / n;
            let mean_y: f64 = g.positions().iter().map(|p| p.1).sum::<f64>() / n;
            assert_relative_eq!(mean_x, 0.0, epsilon = 1e-12);
            assert_relative_eq!(mean_y, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn positions_are_row_major() {
        let g = ArrayGeometry::new(2, 3, 1.0).unwrap();
        // y varies by row, x by column; spacing 1 m makes offsets exact.
        assert_eq!(
            g.positions(),
            &[
                (-1.0, -0.5),
                (0.0, -0.5),
                (1.0, -0.5),
                (-1.0, 0.5),
                (0.0, 0.5),
                (1.0, 0.5),
            ]
        );
    }

    #[test]
    fn raw_phases_stay_in_principal_range() {
        let g = half_wave_geometry(8, 8);
        let incident = DirectionAngle::new(30.0, -45.0);
        for theta in [0.0, 15.0, 60.0, 90.0, 145.0] {
            for phi in [0.0, 10.0, 120.0, 350.0] {
                let outgoing = DirectionAngle::new(theta, phi);
                let phases = raw_phases(&g, WAVELENGTH_28GHZ, incident, outgoing).unwrap();
                for p in phases {
                    assert!((0.0..2.0 * PI).contains(&p), "phase {p} out of range");
                }
            }
        }
    }

    #[test]
    fn bits_are_binary() {
        let g = half_wave_geometry(8, 8);
        let profile = PhaseProfile::compute(
            &g,
            WAVELENGTH_28GHZ,
            DirectionAngle::new(30.0, 0.0),
            DirectionAngle::new(75.0, 130.0),
        )
        .unwrap();
        assert_eq!(profile.bits().len(), 64);
        assert!(profile.bits().iter().all(|&b| b == 0 || b == 1));
    }

    #[test]
    fn boresight_needs_no_deflection() {
        let g = half_wave_geometry(6, 4);
        let dir = DirectionAngle::new(42.0, -17.0);
        let phases = raw_phases(&g, WAVELENGTH_28GHZ, dir, dir).unwrap();
        for p in phases {
            assert_relative_eq!(p, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn retroreflection_at_28ghz_is_all_zero_bits() {
        // 4x4 at half-wave spacing (~5.36 mm), outgoing equal to incident.
        let g = half_wave_geometry(4, 4);
        assert_relative_eq!(g.spacing_m(), 0.005357, epsilon = 1e-6);

        let dir = DirectionAngle::new(30.0, 0.0);
        let profile = PhaseProfile::compute(&g, WAVELENGTH_28GHZ, dir, dir).unwrap();
        assert_eq!(profile.bits(), &[0u8; 16]);
    }

    #[test]
    fn profile_is_deterministic() {
        let g = half_wave_geometry(16, 16);
        let incident = DirectionAngle::new(30.0, 0.0);
        let outgoing = DirectionAngle::new(55.0, 220.0);
        let a = PhaseProfile::compute(&g, WAVELENGTH_28GHZ, incident, outgoing).unwrap();
        let b = PhaseProfile::compute(&g, WAVELENGTH_28GHZ, incident, outgoing).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_nonpositive_wavelength() {
        let g = half_wave_geometry(4, 4);
        let dir = DirectionAngle::new(0.0, 0.0);
        assert!(PhaseProfile::compute(&g, 0.0, dir, dir).is_err());
        assert!(PhaseProfile::compute(&g, -1.0, dir, dir).is_err());
    }

    #[test]
    fn incident_bounds_checked() {
        assert!(DirectionAngle::new(0.0, -180.0).validate_incident().is_ok());
        assert!(DirectionAngle::new(180.0, 180.0).validate_incident().is_ok());
        assert!(DirectionAngle::new(-1.0, 0.0).validate_incident().is_err());
        assert!(DirectionAngle::new(181.0, 0.0).validate_incident().is_err());
        assert!(DirectionAngle::new(90.0, -181.0).validate_incident().is_err());
        assert!(DirectionAngle::new(90.0, 181.0).validate_incident().is_err());
    }
}

use std::time::Duration;

use anyhow::Result;
use ris_sweep::{
    ArrayGeometry, CancelToken, DirectionAngle, GridRange, MeasurementSample, PatternSink,
    PhaseProfile, PowerMeter, RisSession, SweepConfig,
};

/// Stands in for the vendor driver: accepts every pattern.
struct NullSink;

impl PatternSink for NullSink {
    fn send_pattern(&mut self, _profile: &PhaseProfile) -> ris_sweep::Result<()> {
        Ok(())
    }
}

/// Synthetic meter with a power peak at a known reflection direction, for
/// exercising the sweep without hardware.
struct SyntheticMeter {
    peak: DirectionAngle,
}

impl PowerMeter for SyntheticMeter {
    fn measure(&mut self, outgoing: DirectionAngle) -> ris_sweep::Result<f64> {
        let dt = outgoing.theta_deg - self.peak.theta_deg;
        let dp = outgoing.phi_deg - self.peak.phi_deg;
        Ok(-10.0 - 0.01 * (dt * dt + dp * dp))
    }
}

fn main() -> Result<()> {
    let mut builder = env_logger::builder();
    builder.filter_level(log::LevelFilter::Info);
    builder.init();

    let wavelength_m = 3.0e8 / 28.0e9;
    let geometry = ArrayGeometry::new(32, 32, wavelength_m / 2.0)?;
    let session = RisSession::new("RIS-OFFLINE", geometry, wavelength_m)?;

    let config = SweepConfig {
        theta: GridRange::new(0.0, 90.0, 5.0)?,
        phi: GridRange::new(0.0, 360.0, 10.0)?,
        settle: Duration::ZERO,
        top_k: 3,
    };

    let result = session.run_sweep(
        DirectionAngle::new(30.0, 0.0),
        &config,
        &mut NullSink,
        &mut SyntheticMeter {
            peak: DirectionAngle::new(45.0, 120.0),
        },
        &CancelToken::new(),
    )?;

    println!("\nTop 3 Power Values and Corresponding (Theta, Phi):");
    for (i, MeasurementSample { outgoing, power_dbm }) in result.top().iter().enumerate() {
        println!("  #{}:", i + 1);
        println!("    Theta: {}°", outgoing.theta_deg);
        println!("    Phi: {}°", outgoing.phi_deg);
        println!("    Power: {power_dbm} dBm");
    }

    Ok(())
}

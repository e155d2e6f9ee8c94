use std::time::Duration;

use anyhow::{Context, Result};
use ris_sweep::{
    ArrayGeometry, CancelToken, DirectionAngle, PatternSink, PhaseProfile, RisSession,
    SocketMeter, SweepConfig,
};

/// Stands in for an initialized vendor device handle: logs each commanded
/// pattern instead of pushing it over the device link.
struct LoggingSink;

impl PatternSink for LoggingSink {
    fn send_pattern(&mut self, profile: &PhaseProfile) -> ris_sweep::Result<()> {
        log::debug!(
            "Applying {}x{} pattern, {} elements high",
            profile.rows(),
            profile.cols(),
            profile.bits().iter().filter(|&&b| b == 1).count()
        );
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let meter_addr = args
        .next()
        .context("usage: live_sweep <meter-host:port> [theta_in] [phi_in]")?;
    let theta_in: f64 = args.next().as_deref().unwrap_or("30").parse()?;
    let phi_in: f64 = args.next().as_deref().unwrap_or("0").parse()?;

    let incident = DirectionAngle::new(theta_in, phi_in);
    incident
        .validate_incident()
        .context("incident angles out of range")?;

    // 28 GHz 32x32 reference surface at half-wave spacing.
    let wavelength_m = 3.0e8 / 28.0e9;
    let geometry = ArrayGeometry::new(32, 32, wavelength_m / 2.0)?;
    let session = RisSession::new("RIS-0001", geometry, wavelength_m)?;

    println!(
        "Surface: {}x{} at {:.2} mm spacing",
        session.geometry().rows(),
        session.geometry().cols(),
        session.geometry().spacing_m() * 1e3,
    );

    let mut meter = SocketMeter::connect(&meter_addr, Duration::from_millis(1500))
        .with_context(|| format!("Failed to connect to meter at {meter_addr}"))?;
    println!("Connected to meter at {meter_addr}, sweeping...");

    let result = session.run_sweep(
        incident,
        &SweepConfig::reference(),
        &mut LoggingSink,
        &mut meter,
        &CancelToken::new(),
    )?;

    if result.samples().is_empty() {
        println!("No valid power values received.");
        return Ok(());
    }

    println!("\nTop 3 Power Values and Corresponding (Theta, Phi):");
    for (i, sample) in result.top().iter().enumerate() {
        println!("  #{}:", i + 1);
        println!("    Theta: {}°", sample.outgoing.theta_deg);
        println!("    Phi: {}°", sample.outgoing.phi_deg);
        println!("    Power: {} dBm", sample.power_dbm);
    }

    Ok(())
}

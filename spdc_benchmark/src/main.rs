use std::{hint::black_box, time::Instant};

use spdc_solver::{
    hom::{hom_rate_profile, hom_rate_series},
    integrator::Simpson,
    schmidt::schmidt_number,
    SPDC,
};

const RESOLUTION: usize = 500;
const N_DELAYS: usize = 300;

#[allow(clippy::cast_precision_loss)]
fn get_delays(half_width: f64) -> Vec<f64> {
    (0..N_DELAYS)
        .map(|i| -half_width + 2.0 * half_width * i as f64 / (N_DELAYS - 1) as f64)
        .collect()
}

fn hom_rate_series_benchmark(spdc: &SPDC) -> Result<(), spdc_solver::SpdcError> {
    let space = spdc.optimum_range(RESOLUTION)?;
    let spectrum = spdc.joint_spectrum(Simpson::default());
    let start = Instant::now();
    let rates = hom_rate_series(&spectrum, &get_delays(2e-12), &space);
    log::info!(
        "hom_rate_series: {} delays at resolution {RESOLUTION} in {:?}",
        rates.len(),
        start.elapsed()
    );
    black_box(rates);
    Ok(())
}

#[allow(dead_code)]
fn hom_rate_profile_benchmark(spdc: &SPDC) -> Result<(), spdc_solver::SpdcError> {
    let space = spdc.optimum_range(RESOLUTION)?;
    let spectrum = spdc.joint_spectrum(Simpson::default());
    let start = Instant::now();
    let profile = hom_rate_profile(&spectrum, &space, 4)?;
    log::info!(
        "hom_rate_profile: {} delays at resolution {RESOLUTION} in {:?}",
        profile.delays.len(),
        start.elapsed()
    );
    black_box(profile);
    Ok(())
}

#[allow(dead_code)]
fn schmidt_number_benchmark(spdc: &SPDC) -> Result<(), spdc_solver::SpdcError> {
    let space = spdc.optimum_range(RESOLUTION)?;
    let spectrum = spdc.joint_spectrum(Simpson::default());
    let start = Instant::now();
    let k = schmidt_number(&spectrum, &space);
    log::info!("schmidt_number = {k} in {:?}", start.elapsed());
    black_box(k);
    Ok(())
}

fn main() -> Result<(), spdc_solver::SpdcError> {
    env_logger::init();
    let spdc = SPDC::default();
    hom_rate_series_benchmark(&spdc)
}

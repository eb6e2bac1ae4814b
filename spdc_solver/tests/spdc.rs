use approx::{assert_abs_diff_eq, assert_relative_eq};
use spdc_solver::{
    api,
    hom::{hom_rate_series, hom_two_source_visibilities, hom_visibility},
    integrator::{IntegrationMethod, Simpson},
    schmidt::schmidt_number,
    Apodization, BeamRole, OptimizeError, OptimizeOutcome, SpdcError, SPDC,
};

fn get_text_config() -> &'static str {
    r#"
deff_pm_per_volt = 2.0

[crystal]
pm_type = "Type2_e_eo"
theta_deg = 28.8685
length_um = 2000.0
temperature_c = 20.0
kind = "BBO_1"

[pump]
wavelength_nm = 775.0
waist_um = 100.0
bandwidth_nm = 5.35

[signal]
wavelength_nm = 1550.0
waist_um = 100.0

[apodization]
kind = "gaussian"
parameter = { fwhm_um = 800.0 }
"#
}

#[test]
fn text_configuration_round_trip() {
    let spdc = SPDC::from_text(get_text_config()).unwrap();
    assert_relative_eq!(spdc.deff(), 2e-12, max_relative = 1e-12);
    assert!(matches!(spdc.apodization(), Apodization::Gaussian { .. }));
    assert!(spdc.is_energy_conserving(1e-12));

    let text = spdc.to_text().unwrap();
    let restored = SPDC::from_text(&text).unwrap();
    assert_relative_eq!(
        restored.crystal().theta,
        spdc.crystal().theta,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        restored.idler().frequency(),
        spdc.idler().frequency(),
        max_relative = 1e-12
    );
    match (restored.apodization(), spdc.apodization()) {
        (Apodization::Gaussian { fwhm: a }, Apodization::Gaussian { fwhm: b }) => {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
        other => panic!("apodization changed: {other:?}"),
    }
}

#[test]
fn configuration_errors_are_raised_at_assignment() {
    let unknown = get_text_config().replace("BBO_1", "unobtainium");
    assert!(matches!(
        SPDC::from_text(&unknown),
        Err(SpdcError::UnknownMaterial(_))
    ));

    let mut spdc = SPDC::default();
    assert!(matches!(
        spdc.set_crystal_formula("no = 1.5 +\nne = 1.4"),
        Err(SpdcError::FormulaParse(_))
    ));
    assert!(matches!(
        spdc.set_wavelength(BeamRole::Signal, -1.0),
        Err(SpdcError::Domain(_))
    ));
    assert_eq!(spdc, SPDC::default());
}

#[test]
fn grid_transforms_keep_bounds() {
    let space = SPDC::default().optimum_range(25).unwrap();
    let restored = space.to_wavelength_space().to_frequency_space();
    for (a, b) in [
        (space.signal().bounds(), restored.signal().bounds()),
        (space.idler().bounds(), restored.idler().bounds()),
    ] {
        assert_relative_eq!(a.0, b.0, max_relative = 1e-12);
        assert_relative_eq!(a.1, b.1, max_relative = 1e-12);
    }

    let finer = space.set_resolution(101).unwrap();
    assert_eq!(finer.signal().bounds(), space.signal().bounds());
    assert_eq!(finer.shape(), (101, 101));
}

#[test]
fn schmidt_number_is_at_least_one() {
    let spdc = SPDC::default();
    let space = spdc.optimum_range(31).unwrap();
    for method in [
        IntegrationMethod::Simpson { divs: 50 },
        IntegrationMethod::GaussLegendre { degree: 30 },
    ] {
        let k = schmidt_number(&spdc.joint_spectrum(method.integrator()), &space);
        assert!(k >= 1.0, "{k}");
    }
}

#[test]
fn hom_rates_match_delays() {
    let spdc = SPDC::default();
    let space = spdc.optimum_range(31).unwrap();
    let spectrum = spdc.joint_spectrum(Simpson::default());
    let delays = [3e-13, -1e-13, 0.0, 2e-12, -5e-13];
    let rates = hom_rate_series(&spectrum, &delays, &space);
    assert_eq!(rates.len(), delays.len());
    for (tau, rate) in delays.iter().zip(&rates) {
        let single = hom_rate_series(&spectrum, &[*tau], &space);
        assert_abs_diff_eq!(single[0], *rate, epsilon = 1e-15);
        assert!((-1e-9..=1.0 + 1e-9).contains(rate));
    }

    let dip = hom_visibility(&spectrum, &space);
    assert!((0.0..=1.0 + 1e-6).contains(&dip.visibility));
}

#[test]
fn two_source_visibilities_are_physical() {
    let spdc = SPDC::default();
    let space = api::optimum_range(&spdc, 31).unwrap();
    let result = hom_two_source_visibilities(&spdc.joint_spectrum(Simpson::default()), &space);
    for visibility in [result.ss, result.ii, result.si] {
        assert!(
            (-1e-6..=1.0 + 1e-6).contains(&visibility.visibility),
            "{visibility:?}"
        );
    }
    assert!(result.warnings.is_empty());
}

#[test]
fn jsi_peaks_at_phase_matching() {
    let spdc = SPDC::default();
    let spectrum = spdc.joint_spectrum(Simpson::default());
    let (ws, wi) = (spdc.signal().frequency(), spdc.idler().frequency());
    let centre = spectrum.jsi(ws, wi);
    for delta in [-2e13, -1e13, -5e12, 5e12, 1e13, 2e13] {
        assert!(spectrum.jsi(ws + delta, wi - delta) < centre);
        assert!(spectrum.jsi(ws + delta, wi) < centre);
    }
}

#[test]
fn optimizer_outcomes() {
    let mut spdc = SPDC::default();
    assert!(matches!(
        api::try_as_optimum(&mut spdc),
        OptimizeOutcome::AlreadyOptimal { .. }
    ));
    assert_eq!(spdc, SPDC::default());

    spdc.set_wavelength(BeamRole::Signal, 700e-9).unwrap();
    let before = spdc.clone();
    assert!(matches!(
        api::to_optimum(&mut spdc),
        Err(OptimizeError::Infeasible(_))
    ));
    assert_eq!(spdc, before);
}

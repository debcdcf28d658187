use std::f64::consts::PI;

use approx::{assert_abs_diff_eq, assert_relative_eq};

use autofit::data::sample::{SyntheticConfig, generate_samples};
use autofit::domain::{ExtremumKind, FitOptions, ModelKind, SampleSet};
use autofit::fit::{FitResult, Fitter, FitterConfig, RecordValue, fit_samples};

fn synthetic(model: ModelKind, params: &[f64], x_min: f64, x_max: f64, count: usize, noise: f64) -> SampleSet {
    generate_samples(&SyntheticConfig {
        model,
        params: params.to_vec(),
        x_min,
        x_max,
        count,
        noise,
        seed: 11,
    })
    .unwrap()
}

fn fit(samples: &SampleSet, model: ModelKind, options: &FitOptions) -> FitResult {
    fit_samples(samples, model, &FitterConfig::default(), options).unwrap()
}

#[test]
fn every_parametric_family_fits_its_own_noiseless_data() {
    let cases: [(ModelKind, &[f64], f64, f64); 11] = [
        (ModelKind::ExpDecaySinusoid, &[1.0, 3.0, 0.5, 2.0, 0.2], 0.0, 3.0),
        (ModelKind::GaussianDecaySinusoid, &[1.0, 3.0, 0.5, 2.0, 0.2], 0.0, 3.0),
        (ModelKind::Sinusoid, &[1.5, 2.0, 0.3, -0.2], 0.0, 1.0),
        (ModelKind::QuarticSinusoid, &[1.0, 1.0, 0.2, 0.0], 0.0, 2.0),
        (ModelKind::Lorentzian, &[2.0, 0.5, 0.6, 0.1], -3.0, 3.0),
        (ModelKind::Gaussian, &[3.0, 0.2, 0.4, 0.5], -2.0, 2.0),
        (ModelKind::IntegratedGaussian, &[2.0, 0.3, 0.5, -1.0], -3.0, 3.0),
        (ModelKind::Sinc2, &[1.0, 0.0, 0.5, 0.1], -2.0, 2.0),
        (ModelKind::RabiSpectrum, &[0.8, 0.1, 1.0, 0.05], -5.0, 5.0),
        (ModelKind::PowerLaw, &[2.0, 1.5, 0.5], 0.1, 5.0),
        (ModelKind::Exponential, &[2.0, -3.0, 1.0], 0.0, 2.0),
    ];

    for (model, params, x_min, x_max) in cases {
        let samples = synthetic(model, params, x_min, x_max, 301, 0.0);
        let r = fit(&samples, model, &FitOptions::new());
        assert!(
            r.quality.r_squared > 0.9999,
            "{}: R^2 = {}",
            model.display_name(),
            r.quality.r_squared
        );
        assert_eq!(r.names.len(), params.len());
        assert!(!r.weighted);
        assert!(r.evaluations > 0);

        for (i, &want) in params.iter().enumerate() {
            let got = r.params[i];
            let (lo, hi) = r.bounds[i];
            assert!(lo <= got && got <= hi, "{} {}: {got} outside [{lo}, {hi}]", model.display_name(), r.names[i]);

            let diff = if r.names[i] == "phi" {
                phase_distance(got, want, phase_period(model))
            } else {
                (got - want).abs()
            };
            assert!(
                diff <= 1e-6 * want.abs().max(1.0),
                "{} {}: fitted {got}, generated {want}",
                model.display_name(),
                r.names[i]
            );
        }
    }
}

/// `sin⁴` repeats every π in phase, the other oscillations every 2π.
fn phase_period(model: ModelKind) -> f64 {
    match model {
        ModelKind::QuarticSinusoid => PI,
        _ => 2.0 * PI,
    }
}

fn phase_distance(a: f64, b: f64, period: f64) -> f64 {
    let d = (a - b).rem_euclid(period);
    d.min(period - d)
}

#[test]
fn non_negative_parameter_stops_at_its_bound() {
    // With frequency and phase held, the unconstrained optimum is A = -1.
    let x: Vec<f64> = (0..101).map(|i| i as f64 * 0.01).collect();
    let y: Vec<f64> = x.iter().map(|&v| -(2.0 * PI * 2.0 * v).sin()).collect();
    let samples = SampleSet { x, y, yerr: None };
    let options = FitOptions::new().hold("f", 2.0).hold("phi", 0.0);
    let r = fit(&samples, ModelKind::Sinusoid, &options);

    let a = r.param("A").unwrap();
    assert_eq!(r.bounds[0].0, 0.0);
    assert!((0.0..1e-3).contains(&a), "A = {a}");
    assert_abs_diff_eq!(r.param("y0").unwrap(), 0.0, epsilon = 1e-6);
}

#[test]
fn linear_families_fit_smooth_data() {
    let samples = synthetic(ModelKind::Polynomial, &[1.0, -2.0, 0.5, 0.1, -0.05], -2.0, 2.0, 80, 0.0);
    let poly = fit(&samples, ModelKind::Polynomial, &FitOptions::new());
    assert_abs_diff_eq!(poly.params.as_slice(), [1.0, -2.0, 0.5, 0.1, -0.05].as_slice(), epsilon = 1e-8);
    assert_eq!(poly.evaluations, 0);

    let x: Vec<f64> = (0..120).map(|i| i as f64 * 0.05).collect();
    let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
    let mut fitter = Fitter::new(&x, &y, ModelKind::Spline, None, FitterConfig::default()).unwrap();
    let spline = fitter.fit(&FitOptions::new()).unwrap();
    assert!(spline.quality.r_squared > 0.9999);
    assert!(spline.names.iter().all(|n| n.starts_with('b')));
}

#[test]
fn exponential_parameters_are_recovered() {
    let samples = synthetic(ModelKind::Exponential, &[2.0, -3.0, 1.0], 0.0, 2.0, 50, 0.0);
    let r = fit(&samples, ModelKind::Exponential, &FitOptions::new());
    assert_abs_diff_eq!(r.param("A").unwrap(), 2.0, epsilon = 1e-4);
    assert_abs_diff_eq!(r.param("b").unwrap(), -3.0, epsilon = 1e-4);
    assert_abs_diff_eq!(r.param("y0").unwrap(), 1.0, epsilon = 1e-4);
}

#[test]
fn polynomial_maximum_is_located() {
    let x: Vec<f64> = (0..81).map(|i| -3.0 + i as f64 * 0.1).collect();
    let y: Vec<f64> = x.iter().map(|v| 5.0 - (v - 1.0).powi(2)).collect();
    let config = FitterConfig {
        polynomial_degree: 2,
        ..FitterConfig::default()
    };
    let mut fitter = Fitter::new(&x, &y, ModelKind::Polynomial, None, config).unwrap();
    let r = fitter.fit(&FitOptions::new()).unwrap();

    assert_eq!(r.extrema.len(), 1);
    assert_eq!(r.extrema[0].kind, ExtremumKind::Maximum);
    assert_abs_diff_eq!(r.extrema[0].x, 1.0, epsilon = 1e-8);
    assert_abs_diff_eq!(r.extrema[0].y, 5.0, epsilon = 1e-8);
}

#[test]
fn held_parameter_is_exact_and_ignores_bounds() {
    let samples = synthetic(ModelKind::Gaussian, &[0.7, 0.0, 0.5, 0.1], -2.0, 2.0, 101, 0.0);
    let options = FitOptions::new().hold("A", 0.7).bounds("A", 0.0, 1.0);
    let r = fit(&samples, ModelKind::Gaussian, &options);

    assert_eq!(r.param("A"), Some(0.7));
    assert_eq!(r.error("A"), Some(0.0));
    assert!(r.is_held("A"));
    assert_eq!(r.quality.n_free, 3);
    assert_eq!(r.diagnostics.len(), 1);
    let i = r.names.iter().position(|n| n == "A").unwrap();
    assert!(r.covariance.row(i).iter().all(|&c| c == 0.0));
    assert!(r.covariance.column(i).iter().all(|&c| c == 0.0));
    assert_abs_diff_eq!(r.param("sigma").unwrap(), 0.5, epsilon = 1e-6);
}

#[test]
fn unusable_uncertainties_fall_back_to_unweighted() {
    let base = synthetic(ModelKind::Lorentzian, &[2.0, 0.5, 0.6, 0.1], -3.0, 3.0, 61, 0.05);
    let mut bad_err = base.yerr.clone().unwrap();
    bad_err[10] = 0.0;
    let with_bad = SampleSet {
        yerr: Some(bad_err),
        ..base.clone()
    };
    let without = SampleSet { yerr: None, ..base };

    let a = fit(&with_bad, ModelKind::Lorentzian, &FitOptions::new());
    let b = fit(&without, ModelKind::Lorentzian, &FitOptions::new());
    assert!(!a.weighted);
    assert_eq!(a.diagnostics.len(), 1);
    assert!(a.quality.reduced_chi_squared.is_none());
    assert_relative_eq!(a.params.as_slice(), b.params.as_slice(), max_relative = 1e-12);
}

#[test]
fn weighted_fit_reports_reduced_chi_squared() {
    let samples = synthetic(ModelKind::Exponential, &[2.0, -3.0, 1.0], 0.0, 2.0, 200, 0.01);
    let r = fit(&samples, ModelKind::Exponential, &FitOptions::new());
    assert!(r.weighted);
    let chi2 = r.quality.reduced_chi_squared.unwrap();
    assert!(chi2 > 0.5 && chi2 < 1.5, "reduced chi^2 = {chi2}");
    assert!(r.errors.iter().all(|e| e.is_finite() && *e > 0.0));
}

#[test]
fn manual_bounds_confine_the_solution() {
    let samples = synthetic(ModelKind::Exponential, &[2.0, -3.0, 1.0], 0.0, 2.0, 100, 0.0);
    let options = FitOptions::new().bounds("b", -2.0, 0.0);
    let r = fit(&samples, ModelKind::Exponential, &options);
    let b = r.param("b").unwrap();
    assert!((-2.0..=0.0).contains(&b), "b = {b}");
    assert_eq!(r.bounds[1], (-2.0, 0.0));
}

#[test]
fn band_widens_with_confidence_level() {
    let samples = synthetic(ModelKind::Gaussian, &[3.0, 0.2, 0.4, 0.5], -2.0, 2.0, 81, 0.05);
    let r = fit(&samples, ModelKind::Gaussian, &FitOptions::new());
    let x = [-1.0, 0.0, 0.2, 1.5];

    let widths: Vec<Vec<f64>> = [0.5, 0.9, 0.99]
        .iter()
        .map(|&level| {
            let band = r.confidence_band(&x, level).unwrap();
            assert!(!band.degenerate);
            band.upper.iter().zip(&band.lower).map(|(u, l)| u - l).collect()
        })
        .collect();

    for i in 0..x.len() {
        assert!(widths[0][i] > 0.0);
        assert!(widths[1][i] > widths[0][i]);
        assert!(widths[2][i] > widths[1][i]);
    }
    assert!(r.confidence_band(&x, 1.0).is_err());
}

#[test]
fn band_without_residual_freedom_is_unbounded() {
    let samples = SampleSet {
        x: vec![0.0, 1.0],
        y: vec![1.0, 3.0],
        yerr: None,
    };
    let config = FitterConfig {
        polynomial_degree: 1,
        ..FitterConfig::default()
    };
    let r = fit_samples(&samples, ModelKind::Polynomial, &config, &FitOptions::new()).unwrap();
    assert!(r.errors.iter().all(|e| e.is_infinite()));

    let band = r.confidence_band(&[0.0, 0.5, 1.0], 0.9).unwrap();
    assert!(band.sigma.iter().all(|s| *s == f64::INFINITY));
    assert!(band.upper.iter().chain(&band.lower).all(|v| !v.is_nan()));
}

#[test]
fn spline_band_is_degenerate() {
    let x: Vec<f64> = (0..60).map(|i| i as f64 * 0.1).collect();
    let y: Vec<f64> = x.iter().map(|v| v.cos()).collect();
    let samples = SampleSet { x, y, yerr: None };
    let r = fit(&samples, ModelKind::Spline, &FitOptions::new())
        .with_confidence_band(0.95)
        .unwrap();
    let band = r.band.as_ref().unwrap();
    assert!(band.degenerate);
    assert_eq!(band.upper, band.fit);
    assert_eq!(band.lower, band.fit);
}

#[test]
fn record_is_flat_and_complete() {
    let samples = synthetic(ModelKind::Sinusoid, &[1.0, 2.0, 0.0, 0.0], 0.0, 1.0, 50, 0.0);
    let r = fit(&samples, ModelKind::Sinusoid, &FitOptions::new().hold("y0", 0.0))
        .with_confidence_band(0.9)
        .unwrap();
    let rec = r.to_record();

    assert_eq!(rec.get("fit_succeeded"), Some(&RecordValue::Bool(true)));
    assert_eq!(rec.get("model"), Some(&RecordValue::Text("sinusoid".to_string())));
    assert!(matches!(rec.get("held"), Some(RecordValue::NamedFloats(h)) if h.get("y0") == Some(&0.0)));
    assert!(matches!(rec.get("covariance"), Some(RecordValue::FloatMatrix(m)) if m.len() == 4));
    assert!(rec.contains_key("band_upper"));
    assert!(!rec.contains_key("extrema_x"));

    let json = serde_json::to_value(&rec).unwrap();
    assert_eq!(json["fit_succeeded"], serde_json::Value::Bool(true));
    assert!(json["best_fit"]["A"].is_number());
}

#[test]
fn fitter_refuses_values_after_failure() {
    let mut fitter = Fitter::new(
        &[0.0, 1.0, 2.0],
        &[1.0, 2.0, 3.0],
        ModelKind::Polynomial,
        None,
        FitterConfig {
            polynomial_degree: 6,
            ..FitterConfig::default()
        },
    )
    .unwrap();
    assert!(fitter.fit(&FitOptions::new()).is_err());
    assert!(fitter.value(1.0).is_err());
}

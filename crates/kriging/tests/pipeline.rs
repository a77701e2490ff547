//! End-to-end pipeline tests: samples -> variogram -> fit -> system -> grid.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use signalfield_core::{Error, GridSpec};
use signalfield_kriging::{
    empirical_variogram, evaluate_grid, fit_model, FitOptions, KrigingSystem, ModelFamily, Sample,
    SampleStore, VariogramParams,
};

/// Deterministic LCG-based field with a spatial trend plus noise.
fn survey_samples(n: usize, seed: u64) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(n);
    let mut rng = seed;
    let mut next = |scale: f64| {
        rng = rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (rng >> 33) as f64 / (1u64 << 31) as f64 * scale
    };
    for _ in 0..n {
        let x = next(100.0);
        let y = next(100.0);
        let value = 50.0 + 0.5 * x + 0.3 * y + 10.0 * ((x / 20.0).sin() + (y / 20.0).sin());
        let noise = next(2.0) - 1.0;
        samples.push(Sample::new(x, y, value + noise));
    }
    samples
}

#[test]
fn three_sample_scenario() {
    // Minimal survey: (0,0)=10, (10,0)=20, (0,10)=15; spherical model
    // with nugget 0, sill 25, range 15.
    let samples = vec![
        Sample::new(0.0, 0.0, 10.0),
        Sample::new(10.0, 0.0, 20.0),
        Sample::new(0.0, 10.0, 15.0),
    ];
    let store = SampleStore::new(&samples).unwrap();
    let model = ModelFamily::Spherical.model(0.0, 25.0, 15.0);
    let system = KrigingSystem::build(&store, &model).unwrap();

    let at_sample = system.predict(0.0, 0.0);
    assert_relative_eq!(at_sample.estimate, 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(at_sample.variance, 0.0, epsilon = 1e-9);

    let interior = system.predict(5.0, 5.0);
    assert!(
        interior.estimate > 10.0 && interior.estimate < 20.0,
        "interior estimate {}",
        interior.estimate
    );
    assert!(interior.variance > 0.0);
}

#[test]
fn full_pipeline_on_survey_data() {
    let samples = survey_samples(120, 42);
    let store = SampleStore::new(&samples).unwrap();
    let empirical = empirical_variogram(&store, &VariogramParams::default()).unwrap();
    let fitted = fit_model(&empirical, &FitOptions::default()).unwrap();
    assert!(!fitted.fallback_used);

    let system = KrigingSystem::build(&store, &fitted.model).unwrap();
    let spec = GridSpec::from_bounds(0.0, 0.0, 100.0, 100.0, 5.0).unwrap();
    let grid = evaluate_grid(&system, &spec).unwrap();

    // Kriging weights may be negative, so estimates can overshoot the
    // sampled values slightly; the bounds are deliberately loose.
    let (value_min, value_max) = (10.0, 160.0);
    for row in 0..grid.estimate.rows() {
        for col in 0..grid.estimate.cols() {
            let e = grid.estimate.get(row, col).unwrap();
            let v = grid.variance.get(row, col).unwrap();
            assert!(e.is_finite());
            assert!(
                e > value_min && e < value_max,
                "estimate {e} at ({row},{col}) outside plausible field bounds"
            );
            assert!(v >= 0.0);
        }
    }

    // The renderer normalizes colors from these.
    let (min, max) = grid.estimate.min_max().unwrap();
    assert!(min < max);
}

#[test]
fn pipeline_is_deterministic() {
    let run = || {
        let samples = survey_samples(80, 7);
        let store = SampleStore::new(&samples).unwrap();
        let empirical = empirical_variogram(&store, &VariogramParams::default()).unwrap();
        let fitted = fit_model(&empirical, &FitOptions::default()).unwrap();
        let system = KrigingSystem::build(&store, &fitted.model).unwrap();
        let spec = GridSpec::new(0.0, 0.0, 10.0, 10, 10);
        evaluate_grid(&system, &spec).unwrap()
    };
    let first = run();
    let second = run();
    assert_eq!(first.estimate, second.estimate);
    assert_eq!(first.variance, second.variance);
}

#[test]
fn variance_non_decreasing_away_from_samples() {
    let samples = vec![
        Sample::new(0.0, 0.0, 10.0),
        Sample::new(10.0, 0.0, 20.0),
        Sample::new(0.0, 10.0, 15.0),
    ];
    let store = SampleStore::new(&samples).unwrap();
    let model = ModelFamily::Spherical.model(0.0, 25.0, 15.0);
    let system = KrigingSystem::build(&store, &model).unwrap();

    // Walk along the negative x axis: the distance to the nearest sample
    // grows strictly with every step.
    let mut previous = 0.0;
    for step in 1..=10 {
        let x = -2.0 * step as f64;
        let p = system.predict(x, 0.0);
        assert!(
            p.variance >= previous - 1e-9,
            "variance decreased: {} -> {} at x={x}",
            previous,
            p.variance
        );
        previous = p.variance;
    }
}

#[test]
fn two_samples_is_insufficient() {
    let samples = vec![Sample::new(0.0, 0.0, 1.0), Sample::new(5.0, 5.0, 2.0)];
    assert!(matches!(
        SampleStore::new(&samples),
        Err(Error::InsufficientSamples(_))
    ));
}

#[test]
fn duplicate_locations_are_merged_before_fitting() {
    // Two measurements at one spot with different values must be averaged
    // by the store, keeping the covariance matrix non-singular without
    // any regularization.
    let samples = vec![
        Sample::new(0.0, 0.0, 10.0),
        Sample::new(0.0, 0.0, 30.0),
        Sample::new(10.0, 0.0, 20.0),
        Sample::new(0.0, 10.0, 15.0),
    ];
    let store = SampleStore::new(&samples).unwrap();
    assert_eq!(store.len(), 3);

    let model = ModelFamily::Spherical.model(0.0, 25.0, 15.0);
    let system = KrigingSystem::build(&store, &model).unwrap();
    let p = system.predict(0.0, 0.0);
    assert_relative_eq!(p.estimate, 20.0, epsilon = 1e-9); // mean of 10 and 30
}

#[test]
fn fallback_model_keeps_pipeline_alive() {
    // A constant field has a flat (all-zero) empirical variogram; the fit
    // diverges and the caller-supplied fixed model takes over.
    let mut samples = Vec::new();
    for i in 0..5 {
        for j in 0..5 {
            samples.push(Sample::new(i as f64 * 10.0, j as f64 * 10.0, 42.0));
        }
    }
    let store = SampleStore::new(&samples).unwrap();
    let empirical = empirical_variogram(&store, &VariogramParams::default()).unwrap();

    assert!(matches!(
        fit_model(&empirical, &FitOptions::default()),
        Err(Error::VariogramFitDivergence(_))
    ));

    let options = FitOptions {
        fallback: Some(ModelFamily::Spherical.model(0.01, 1.0, 30.0)),
        ..Default::default()
    };
    let fitted = fit_model(&empirical, &options).unwrap();
    assert!(fitted.fallback_used);

    let system = KrigingSystem::build(&store, &fitted.model).unwrap();
    let p = system.predict(25.0, 25.0);
    assert_relative_eq!(p.estimate, 42.0, epsilon = 1e-6);
}

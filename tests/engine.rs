use std::sync::OnceLock;

use hiscore::synthetic::{generate_reference_set, SyntheticConfig};
use hiscore::{
    create, Direction, Dominance, HiScoreEngine, HiScoreError, QpOutcome, QpSolver,
    QuadraticProgram, ReferencePoint, ReferenceSet, ValueRange,
};
use proptest::prelude::*;

const MONO: [Direction; 3] = [
    Direction::Increasing,
    Direction::Increasing,
    Direction::Decreasing,
];

fn anchors(low: f64, high: f64) -> Vec<ReferencePoint> {
    vec![
        ReferencePoint::new([0.0, 0.0, 1.0], low),
        ReferencePoint::new([1.0, 1.0, 0.0], high),
    ]
}

fn two_point_engine() -> HiScoreEngine {
    create(anchors(0.0, 100.0), MONO.to_vec(), Some(0.0), Some(100.0)).unwrap()
}

fn approx(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

/// Panics if construction ever reaches the solve stage.
struct MustNotSolve;

impl QpSolver for MustNotSolve {
    fn solve(&self, _program: &QuadraticProgram) -> QpOutcome {
        panic!("solver invoked on an inconsistent reference set");
    }
}

#[test]
fn reference_anchors_evaluate_to_their_values() {
    let engine = two_point_engine();
    let scores = engine
        .evaluate(&[[0.0, 0.0, 1.0], [1.0, 1.0, 0.0]])
        .unwrap();
    assert!(approx(scores[0], 0.0, 1e-5), "{scores:?}");
    assert!(approx(scores[1], 100.0, 1e-5), "{scores:?}");
}

#[test]
fn unbounded_two_point_scenario_is_exact() {
    let engine = create(anchors(0.0, 100.0), MONO.to_vec(), None, None).unwrap();
    let scores = engine
        .evaluate(&[[0.0, 0.0, 1.0], [1.0, 1.0, 0.0]])
        .unwrap();
    assert_eq!(scores, vec![0.0, 100.0]);

    let mid = engine.evaluate_one(&[0.5, 0.5, 0.5]).unwrap();
    assert!(approx(mid, 50.0, 1e-6), "{mid}");
}

#[test]
fn reference_values_survive_large_magnitudes() {
    for k in [1e4, 1e6, 1e9] {
        let points = vec![
            ReferencePoint::new([0.0, 0.0], 0.0),
            ReferencePoint::new([1.0, 0.0], k),
            ReferencePoint::new([0.0, 1.0], 0.005 * k),
            ReferencePoint::new([1.0, 1.0], 2.0 * k),
            ReferencePoint::new([0.5, 0.5], 1e-6 * k),
        ];
        let engine = create(
            points.clone(),
            vec![Direction::Increasing, Direction::Increasing],
            None,
            None,
        )
        .unwrap_or_else(|e| panic!("values at scale {k}: {e}"));
        assert_eq!(engine.len(), 5);

        for p in &points {
            let got = engine.evaluate_one(&p.coords).unwrap();
            assert!(
                approx(got, p.value, 1e-6 * 2.0 * k),
                "scale {k}: {:?} evaluated to {got}, expected {}",
                p.coords,
                p.value
            );
        }
    }
}

#[test]
fn midpoint_lands_strictly_between_anchors() {
    let engine = two_point_engine();
    let mid = engine.evaluate_one(&[0.5, 0.5, 0.5]).unwrap();
    assert!(mid > 0.0 && mid < 100.0);
    assert!(approx(mid, 50.0, 1e-3), "{mid}");
}

#[test]
fn diagonal_between_anchors_is_linear() {
    let engine = two_point_engine();
    for t in [0.1, 0.25, 0.8] {
        let b = engine.score_bounds(&[t, t, 1.0 - t]).unwrap();
        assert!(approx(b.estimate, 100.0 * t, 1e-3), "t={t}: {b:?}");
        assert!(b.raw_lower <= b.raw_upper + 1e-4, "t={t}: {b:?}");
    }
}

#[test]
fn queries_beyond_the_range_clamp_exactly() {
    let engine = two_point_engine();
    assert_eq!(engine.evaluate_one(&[2.0, 2.0, -1.0]).unwrap(), 100.0);
    assert_eq!(engine.evaluate_one(&[-1.0, -1.0, 2.0]).unwrap(), 0.0);

    // Far outside the hull the raw cone bounds may cross; clamping still
    // reports the bound.
    let b = engine.score_bounds(&[2.0, 2.0, -1.0]).unwrap();
    assert!(b.raw_lower > b.raw_upper);
    assert_eq!((b.lower, b.upper), (100.0, 100.0));
}

#[test]
fn repeated_evaluation_is_bit_identical() {
    let engine = two_point_engine();
    let queries = [[0.3, 0.9, 0.2], [0.7, 0.1, 0.6], [1.5, -0.5, 0.5]];
    let first = engine.evaluate(&queries).unwrap();
    let second = engine.evaluate(&queries).unwrap();
    let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn dominating_point_with_smaller_value_fails_before_solving() {
    let err = HiScoreEngine::with_solver(
        anchors(50.0, 10.0),
        MONO.to_vec(),
        ValueRange::unbounded(),
        None,
        &MustNotSolve,
    )
    .unwrap_err();
    assert_eq!(
        err,
        HiScoreError::MonotonicityViolation {
            point: vec![0.0, 0.0, 1.0],
            value: 50.0,
            other: vec![1.0, 1.0, 0.0],
            other_value: 10.0,
            relation: Dominance::Greater,
        }
    );
}

#[test]
fn out_of_range_reference_value_is_rejected() {
    let err = create(anchors(0.0, 150.0), MONO.to_vec(), Some(0.0), Some(100.0)).unwrap_err();
    assert!(matches!(
        err,
        HiScoreError::BoundsViolation { value, bound, .. } if value == 150.0 && bound == 100.0
    ));
}

#[test]
fn solver_failures_surface_as_construction_errors() {
    struct Infeasible;
    impl QpSolver for Infeasible {
        fn solve(&self, _program: &QuadraticProgram) -> QpOutcome {
            QpOutcome::Infeasible
        }
    }
    let err = HiScoreEngine::with_solver(
        anchors(0.0, 100.0),
        MONO.to_vec(),
        ValueRange::unbounded(),
        None,
        &Infeasible,
    )
    .unwrap_err();
    assert!(matches!(err, HiScoreError::Infeasible { .. }));
}

#[test]
fn query_errors_are_typed() {
    let engine = two_point_engine();
    assert_eq!(
        engine.evaluate(&[vec![0.5, 0.5]]),
        Err(HiScoreError::DimensionMismatch {
            expected: 3,
            got: 2
        })
    );
    assert_eq!(
        engine.value_bounds(&[0.5, 0.5, 0.5]),
        Err(HiScoreError::UnknownPoint {
            point: vec![0.5, 0.5, 0.5]
        })
    );
    assert!(matches!(
        engine.evaluate_one(&[f64::NAN, 0.0, 0.0]),
        Err(HiScoreError::NonFinite { .. })
    ));
}

fn small_set() -> Vec<ReferencePoint> {
    vec![
        ReferencePoint::new([0.0, 0.0, 1.0], 0.0),
        ReferencePoint::new([0.5, 0.2, 0.6], 30.0),
        ReferencePoint::new([0.2, 0.7, 0.4], 45.0),
        ReferencePoint::new([0.6, 0.6, 0.3], 60.0),
        ReferencePoint::new([1.0, 1.0, 0.0], 100.0),
    ]
}

#[test]
fn reference_estimates_sit_inside_value_bounds() {
    let points = small_set();
    let engine = create(points.clone(), MONO.to_vec(), Some(0.0), Some(100.0)).unwrap();
    for p in &points {
        let (lo, hi) = engine.value_bounds(&p.coords).unwrap();
        assert_eq!((lo, hi), (p.value, p.value));

        let b = engine.score_bounds(&p.coords).unwrap();
        assert!(b.estimate >= lo - 1e-4 && b.estimate <= hi + 1e-4, "{p:?}: {b:?}");
        assert!(b.raw_lower <= b.raw_upper + 1e-4, "{p:?}: {b:?}");
        assert!(approx(b.estimate, p.value, 1e-4), "{p:?}: {b:?}");
    }
}

#[test]
fn dominance_bounds_fall_back_to_the_range() {
    let engine = create(small_set(), MONO.to_vec(), Some(0.0), Some(100.0)).unwrap();
    // Between (0.5, 0.2, 0.6) below and (0.6, 0.6, 0.3) above.
    assert_eq!(engine.dominance_bounds(&[0.55, 0.5, 0.35]).unwrap(), (30.0, 60.0));
    assert_eq!(engine.dominance_bounds(&[2.0, 2.0, -1.0]).unwrap(), (100.0, 100.0));

    let unbounded = create(small_set(), MONO.to_vec(), None, None).unwrap();
    assert_eq!(
        unbounded.dominance_bounds(&[2.0, 2.0, -1.0]).unwrap(),
        (100.0, 1e47)
    );
}

#[test]
fn duplicate_reference_coordinates_collapse_when_values_agree() {
    let mut points = anchors(0.0, 100.0);
    points.push(ReferencePoint::new([1.0, 1.0, 0.0], 100.0));
    let engine = create(points.clone(), MONO.to_vec(), None, None).unwrap();
    assert_eq!(engine.len(), 2);

    points.push(ReferencePoint::new([1.0, 1.0, 0.0], 99.0));
    assert!(matches!(
        create(points, MONO.to_vec(), None, None),
        Err(HiScoreError::DuplicatePoint { .. })
    ));
}

#[test]
fn reference_set_json_builds_an_engine() {
    let raw = r#"{
        "monotonicity": [1, 1, -1],
        "minval": 0,
        "maxval": 100,
        "points": [
            {"coords": [0, 0, 1], "value": 0},
            {"coords": [1, 1, 0], "value": 100}
        ],
        "config": {"solver": {"max_iterations": 200}}
    }"#;
    let set: ReferenceSet = serde_json::from_str(raw).unwrap();
    let engine = HiScoreEngine::from_reference_set(set).unwrap();
    assert_eq!(engine.dims(), 3);
    assert_eq!(engine.monotonicity(), &MONO);
    assert_eq!(engine.config().solver.max_iterations, 200);
    assert_eq!(engine.value_range().max, Some(100.0));
}

#[test]
fn engine_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HiScoreEngine>();

    let engine = two_point_engine();
    let expected = engine.evaluate_one(&[0.4, 0.4, 0.6]).unwrap();
    let shared = &engine;
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(move || shared.evaluate_one(&[0.4, 0.4, 0.6]).unwrap()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap().to_bits(), expected.to_bits());
        }
    });
}

fn synthetic_engine() -> &'static HiScoreEngine {
    static ENGINE: OnceLock<HiScoreEngine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let set = generate_reference_set(&SyntheticConfig {
            points: 25,
            seed: 11,
            ..SyntheticConfig::default()
        })
        .unwrap();
        HiScoreEngine::from_reference_set(set).unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn evaluate_is_monotone_in_every_dimension(
        base in prop::array::uniform3(-0.25f64..1.25),
        dim in 0usize..3,
        step in 0.0f64..1.0,
    ) {
        let engine = synthetic_engine();
        let mut moved = base;
        moved[dim] += step;

        let before = engine.evaluate_one(&base).unwrap();
        let after = engine.evaluate_one(&moved).unwrap();
        match MONO[dim] {
            Direction::Increasing => {
                prop_assert!(after >= before - 1e-9, "{} -> {}", before, after);
            }
            Direction::Decreasing => {
                prop_assert!(after <= before + 1e-9, "{} -> {}", before, after);
            }
        }
    }
}

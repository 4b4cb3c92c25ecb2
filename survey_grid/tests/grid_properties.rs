use survey_grid::{
    config::{ExtrapolationPolicy, GridConfig},
    grid::{GridBuilder, GridSpec},
    pipeline::build_surface,
    points::PointSet,
};

fn expected_nodes(span: f64, cell: f64) -> usize {
    (span / cell).ceil() as usize + 1
}

#[test]
fn node_count_formula_and_containment() {
    let pts = PointSet::from_triples(&[
        (3.0, 7.0, 1.0),
        (17.5, 9.25, 2.0),
        (8.0, 22.0, 3.0),
        (12.0, 14.0, 4.0),
    ]);
    for cell in [0.7, 1.0, 2.5, 3.0, 50.0] {
        let builder = GridBuilder::new(&GridConfig::with_cell_size(cell)).unwrap();
        let spec = builder.spec_for(&pts).unwrap();
        let cols = expected_nodes(spec.x_max - spec.x_min, cell);
        let rows = expected_nodes(spec.y_max - spec.y_min, cell);
        assert_eq!(spec.node_count(), cols * rows, "cell {}", cell);
        assert_eq!(spec.sample_coordinates().len(), cols * rows);
        for p in pts.iter() {
            assert!(p.x >= spec.x_min && p.x <= spec.x_max);
            assert!(p.y >= spec.y_min && p.y <= spec.y_max);
        }
        let covered = spec.covered_bounds();
        assert!(covered.x_max >= spec.x_max && covered.x_max - spec.x_max < cell);
        assert!(covered.y_max >= spec.y_max && covered.y_max - spec.y_max < cell);
    }
}

#[test]
fn triangle_scenario_flags_outside_corner() {
    let pts = PointSet::from_triples(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 1.0)]);

    let (_, grid) = build_surface(&pts, &GridConfig::with_cell_size(1.0)).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (2, 2));
    assert_eq!(grid.spec(), &GridSpec::new(0.0, 1.0, 0.0, 1.0, 1.0).unwrap());
    assert_eq!(grid.is_extrapolated(0, 0), Some(false));
    assert_eq!(grid.is_extrapolated(0, 1), Some(false));
    assert_eq!(grid.is_extrapolated(1, 0), Some(false));
    assert_eq!(grid.is_extrapolated(1, 1), Some(true));
    // Nearest-neighbour tie between (1,0) and (0,1) resolves to input order.
    assert_eq!(grid.elevation(1, 1), Some(0.0));
    assert_eq!(grid.extrapolated_count(), 1);

    let flat = GridConfig::with_cell_size(1.0).policy(ExtrapolationPolicy::FlatBoundary);
    let (_, grid) = build_surface(&pts, &flat).unwrap();
    assert_eq!(grid.is_extrapolated(1, 1), Some(true));
    assert!((grid.elevation(1, 1).unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn grid_reproduces_samples_on_nodes() {
    let mut triples = Vec::new();
    for j in 0..6 {
        for i in 0..6 {
            let x = 100.0 + 2.0 * i as f64;
            let y = 50.0 + 2.0 * j as f64;
            let z = 10.0 + ((i * 7 + j * 3) % 5) as f64 * 0.3;
            triples.push((x, y, z));
        }
    }
    let pts = PointSet::from_triples(&triples);
    let (_, grid) = build_surface(&pts, &GridConfig::with_cell_size(1.0)).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (11, 11));
    for p in pts.iter() {
        let (row, col) = grid.node_at(p.x, p.y).unwrap();
        assert!((grid.elevation(row, col).unwrap() - p.z).abs() < 1e-9);
        assert!((grid.sample(p.x, p.y).unwrap() - p.z).abs() < 1e-9);
    }
    assert_eq!(grid.extrapolated_count(), 0);
}

#[test]
fn parallel_evaluation_is_repeatable() {
    let mut triples = Vec::new();
    for i in 0..60 {
        let t = i as f64;
        triples.push(((t * 1.7).sin() * 30.0, (t * 0.9).cos() * 20.0, t.sqrt()));
    }
    let pts = PointSet::from_triples(&triples);
    let cfg = GridConfig::with_cell_size(0.75).margin(2.0);
    let (_, a) = build_surface(&pts, &cfg).unwrap();
    let (_, b) = build_surface(&pts, &cfg).unwrap();
    assert_eq!(a, b);
    assert!(a.extrapolated_count() > 0);
    assert!(a.elevations().iter().all(|z| z.is_finite()));
}

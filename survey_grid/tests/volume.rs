use survey_grid::{
    config::GridConfig,
    grid::{GridSpec, SurfaceGrid},
    pipeline::{build_surface, build_surface_on, run_volume, VolumeBaseline},
    points::PointSet,
    volume::{Reference, VolumeCalculator},
    SurfaceError,
};

#[test]
fn uniform_one_unit_above_flat_reference() {
    let spec = GridSpec::new(0.0, 2.0, 0.0, 2.0, 1.0).unwrap();
    let grid = SurfaceGrid::flat(spec, 1.0);
    let report = VolumeCalculator::default()
        .compute(&grid, Reference::Elevation(0.0))
        .unwrap();
    assert!((report.total_fill - 4.0).abs() < 1e-12);
    assert_eq!(report.total_cut, 0.0);
    assert!((report.net - 4.0).abs() < 1e-12);
}

#[test]
fn plane_survey_volume_to_datum() {
    // z = 1 + x / 10 over a 10 x 10 square; mean height 1.5
    let pts = PointSet::from_triples(&[
        (0.0, 0.0, 1.0),
        (10.0, 0.0, 2.0),
        (10.0, 10.0, 2.0),
        (0.0, 10.0, 1.0),
        (5.0, 5.0, 1.5),
    ]);
    let (grid, report) = run_volume(
        &pts,
        VolumeBaseline::Elevation(0.0),
        &GridConfig::with_cell_size(2.0),
    )
    .unwrap();
    assert_eq!(grid.extrapolated_count(), 0);
    assert_eq!(report.cells.len(), 25);
    assert!((report.total_fill - 150.0).abs() < 1e-9);
    assert!((report.net - 150.0).abs() < 1e-9);

    let (_, report) = run_volume(
        &pts,
        VolumeBaseline::Elevation(1.5),
        &GridConfig::with_cell_size(2.0),
    )
    .unwrap();
    // mean column differences -0.4, -0.2, 0, 0.2, 0.4 over five rows of 4 m² cells
    assert!((report.total_fill - 12.0).abs() < 1e-9);
    assert!((report.total_cut + 12.0).abs() < 1e-9);
    assert!(report.net.abs() < 1e-9);
}

#[test]
fn volume_report_is_idempotent() {
    let mut triples = Vec::new();
    for i in 0..30 {
        let t = i as f64;
        triples.push(((t * 2.3).sin() * 15.0, (t * 1.1).cos() * 15.0, (t * 0.5).sin() * 3.0));
    }
    let pts = PointSet::from_triples(&triples);
    let (_, grid) = build_surface(&pts, &GridConfig::with_cell_size(1.5)).unwrap();
    let calc = VolumeCalculator::new(false);
    let a = calc.compute(&grid, Reference::Elevation(0.25)).unwrap();
    let b = calc.compute(&grid, Reference::Elevation(0.25)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.total_fill.to_bits(), b.total_fill.to_bits());
    assert_eq!(a.total_cut.to_bits(), b.total_cut.to_bits());
}

#[test]
fn mismatched_reference_grid() {
    let pts = PointSet::from_triples(&[(0.0, 0.0, 1.0), (4.0, 0.0, 1.0), (0.0, 4.0, 1.0)]);
    let cfg = GridConfig::with_cell_size(1.0);
    let (_, grid) = build_surface(&pts, &cfg).unwrap();
    let other_spec = GridSpec::new(0.0, 4.0, 0.0, 4.0, 2.0).unwrap();
    let other = build_surface_on(&pts, other_spec, &cfg).unwrap();
    let err = VolumeCalculator::default()
        .compute(&grid, Reference::Surface(&other))
        .unwrap_err();
    assert!(matches!(err, SurfaceError::GridMismatch(_)));
}

#[test]
fn excluding_extrapolated_cells_reduces_covered_area() {
    let pts = PointSet::from_triples(&[(0.0, 0.0, 1.0), (4.0, 0.0, 1.0), (0.0, 4.0, 1.0)]);
    let keep = GridConfig::with_cell_size(1.0);
    let drop = GridConfig::with_cell_size(1.0).exclude_extrapolated(true);
    let (_, all) = run_volume(&pts, VolumeBaseline::Elevation(0.0), &keep).unwrap();
    let (_, trimmed) = run_volume(&pts, VolumeBaseline::Elevation(0.0), &drop).unwrap();
    assert!((all.total_fill - 16.0).abs() < 1e-9);
    assert!(trimmed.excluded_cells > 0);
    assert!(trimmed.total_fill < all.total_fill);
    assert!((trimmed.area + trimmed.excluded_cells as f64 - 16.0).abs() < 1e-9);
}

use survey_grid::config::{ExtrapolationPolicy, GridConfig, InterpolationMethod};
use tempfile::NamedTempFile;

#[test]
fn config_file_round_trip() {
    let cfg = GridConfig::with_cell_size(0.5)
        .margin(1.0)
        .method(InterpolationMethod::RadialBasis)
        .policy(ExtrapolationPolicy::FlatBoundary)
        .exclude_extrapolated(true);
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap();
    cfg.write_json_file(path).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("\"radial-basis\""));
    assert!(text.contains("\"flat-boundary\""));
    assert_eq!(GridConfig::from_json_file(path).unwrap(), cfg);
}

#[test]
fn missing_config_file() {
    let file = NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();
    drop(file);
    let err = GridConfig::from_json_file(path.to_str().unwrap()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

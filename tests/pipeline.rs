use std::fs;

use cubefind::data::loader::{load_cube, load_mask, write_cube, write_mask};
use cubefind::data::model::{Cube, Mask, Shape};
use cubefind::error::StepError;
use cubefind::options::{read_pipeline_options, ConfigError, ConfigWarning};
use cubefind::pipeline::Pipeline;

fn write_options(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("pipeline.options");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_full_run_writes_mask() {
    let dir = tempfile::tempdir().unwrap();
    let shape = Shape::new(4, 1, 1);
    let cube = Cube::from_vec(shape, vec![-5.0, 0.0, 5.0, f64::NAN]).unwrap();
    let cube_path = dir.path().join("cube.json");
    write_cube(&cube_path, &cube, false).unwrap();

    let options = write_options(
        dir.path(),
        &format!(
            "# test run\n\
             steps.doThreshold = true\n\
             steps.doWriteMask = yes\n\
             steps.doWriteFilteredCube = True\n\
             import.inFile = {}\n\
             threshold.threshold = 4.0     # absolute level\n\
             threshold.clipMethod = absolute\n\
             threshold.sigma = 3\n\
             threshold.threshold = 100\n",
            cube_path.display()
        ),
    );

    let parsed = read_pipeline_options(&options).unwrap();
    assert_eq!(parsed.warnings.len(), 2);
    assert!(matches!(parsed.warnings[0], ConfigWarning::UnknownParameter { line_number: 8, .. }));
    assert!(matches!(parsed.warnings[1], ConfigWarning::DuplicateParameter { line_number: 9, .. }));

    let (cube_out, mask, summary) = Pipeline::new(parsed.store).run().unwrap();
    assert_eq!(
        summary.executed,
        vec!["doThreshold", "doWriteFilteredCube", "doWriteMask"]
    );
    assert_eq!(mask.bits(), &[Mask::NEGATIVE, 0, Mask::POSITIVE, 0]);
    assert!(cube_out.values()[3].is_nan());

    let written = load_mask(&dir.path().join("cube_mask.json"), shape).unwrap();
    assert_eq!(written, mask);
    let filtered = load_cube(&dir.path().join("cube_filtered.json")).unwrap();
    assert!(filtered.values()[3].is_nan());
    assert_eq!(filtered.values()[2], 5.0);
}

#[test]
fn test_input_mask_bits_survive() {
    let dir = tempfile::tempdir().unwrap();
    let shape = Shape::new(3, 1, 1);
    let cube_path = dir.path().join("cube.csv");
    let mask_path = dir.path().join("prior.csv");
    write_cube(&cube_path, &Cube::from_vec(shape, vec![10.0, 0.0, -10.0]).unwrap(), false).unwrap();
    write_mask(&mask_path, &Mask::from_vec(shape, vec![0, 0x04, 0x04]).unwrap(), false).unwrap();

    let options = write_options(
        dir.path(),
        &format!(
            "steps.doThreshold = true\n\
             import.inFile = {}\n\
             import.maskFile = {}\n\
             threshold.threshold = 1\n\
             threshold.clipMethod = absolute\n",
            cube_path.display(),
            mask_path.display()
        ),
    );
    let parsed = read_pipeline_options(&options).unwrap();
    let (_, mask, _) = Pipeline::new(parsed.store).run().unwrap();
    assert_eq!(mask.bits(), &[Mask::POSITIVE, 0x04, 0x04 | Mask::NEGATIVE]);
}

#[test]
fn test_malformed_file_returns_no_store() {
    let dir = tempfile::tempdir().unwrap();
    let options = write_options(dir.path(), "steps.doThreshold = true\nnovaluehere\n");
    match read_pipeline_options(&options) {
        Err(ConfigError::MalformedLine { line_number: 2, line }) => assert_eq!(line, "novaluehere"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_relative_clip_with_unknown_rms_mode() {
    let dir = tempfile::tempdir().unwrap();
    let cube_path = dir.path().join("cube.json");
    write_cube(&cube_path, &Cube::filled(Shape::new(2, 2, 2), 1.0), false).unwrap();
    let options = write_options(
        dir.path(),
        &format!(
            "steps.doThreshold = true\nimport.inFile = {}\nthreshold.threshold = 3\n\
             threshold.clipMethod = relative\nthreshold.rmsMode = gauss\n",
            cube_path.display()
        ),
    );
    let parsed = read_pipeline_options(&options).unwrap();
    assert!(matches!(
        Pipeline::new(parsed.store).run(),
        Err(StepError::InvalidRmsMode(mode)) if mode == "gauss"
    ));
}

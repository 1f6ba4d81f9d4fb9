//! Reader integration tests: files on disk, gzip transparency, and the
//! read-then-solve pipeline against pivot-core.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use pivot_core::{Model, ModelStatus};
use pivot_io::{read_mps, MpsError};

const SCENARIO_LP: &str = "\
NAME          scenario1
ROWS
 N  COST
 L  C1
 G  C2
COLUMNS
    X1  COST  1.0  C1  1.0
    X1  C2    2.0
    X2  COST  1.0  C1  1.0
    X2  C2    1.0
RHS
    RHS  C1  4.0  C2  3.0
BOUNDS
 UP BND X1 3.0
ENDATA
";

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("pivot-io-test-{}-{}", std::process::id(), name));
    path
}

#[test]
fn test_read_and_solve_scenario() -> Result<()> {
    let path = temp_path("scenario1.mps");
    std::fs::write(&path, SCENARIO_LP)?;

    let parsed = read_mps(&path, None)?;
    std::fs::remove_file(&path).ok();

    let mut model = Model::new();
    model.pass_lp(parsed.lp)?;
    let status = model.run()?;
    assert_eq!(status, ModelStatus::Optimal);
    assert!(
        (model.info().objective_function_value - 1.5).abs() < 1e-6,
        "objective = {}",
        model.info().objective_function_value
    );
    // One optimum is x = (1.5, 0); any optimum must attain the same value.
    let x = &model.solution().col_value;
    assert!((x[0] + x[1] - 1.5).abs() < 1e-6, "x = {:?}", x);
    Ok(())
}

#[test]
fn test_gzip_transparent() -> Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = temp_path("scenario1.mps.gz");
    let file = File::create(&path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(SCENARIO_LP.as_bytes())?;
    encoder.finish()?;

    let parsed = read_mps(&path, None)?;
    std::fs::remove_file(&path).ok();

    assert_eq!(parsed.lp.num_col, 2);
    assert_eq!(parsed.lp.num_row, 2);
    assert_eq!(parsed.lp.model_name, "scenario1");
    Ok(())
}

#[test]
fn test_file_not_found() {
    let err = read_mps(temp_path("does-not-exist.mps"), None);
    assert!(matches!(err, Err(MpsError::FileNotFound(_))));
}

#[test]
fn test_mip_relaxation_pipeline() -> Result<()> {
    // A 0-1 model read from MPS: the relaxation bounds the integer optimum.
    let text = "\
NAME knap
ROWS
 N obj
 G pick
COLUMNS
    MARKER 'MARKER' 'INTORG'
    x1 obj 3.0 pick 1.0
    x2 obj 5.0 pick 1.0
    MARKER 'MARKER' 'INTEND'
RHS
    rhs pick 1.0
BOUNDS
 BV BND x1
 BV BND x2
ENDATA
";
    let path = temp_path("knap.mps");
    std::fs::write(&path, text)?;
    let parsed = read_mps(&path, None)?;
    std::fs::remove_file(&path).ok();

    assert!(parsed.lp.is_mip());
    let mut model = Model::new();
    model.pass_lp(parsed.lp)?;

    let sf = model.form_standard_form_lp()?;
    assert!(sf.num_col >= 2);

    // Solving the bound relaxation directly cannot exceed the integer
    // optimum (3, taking x1).
    let status = model.run()?;
    assert_eq!(status, ModelStatus::Optimal);
    assert!(model.info().objective_function_value <= 3.0 + 1e-6);
    Ok(())
}

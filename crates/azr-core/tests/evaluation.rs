mod common;

use azr_core::domain::{AzrErrorCategory, RunMode, SpinParity};
use azr_core::modules::workspace::WorkspaceAllocator;
use azr_core::{Azr, Config};
use common::{BlockedDataDirSolver, FailingSolver, FakeSolver, entries, write_model};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn evaluator<S: azr_core::modules::solver::Solver>(temp: &Path, solver: S) -> Azr<S> {
    let config = Config::load(&write_model(temp), None).expect("model should load");
    Azr::new(config, solver, WorkspaceAllocator::new(temp.join("runs")))
}

#[test]
fn model_exposes_level_and_normalization_parameters() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default());

    assert_eq!(azr.config().n1(), 2);
    assert_eq!(azr.config().n2(), 1);
    assert_eq!(azr.config().input_values(), vec![2.37, 33600.0, 1.0]);
    assert_eq!(
        azr.output_files(),
        ["AZUREOut_aa=1_R=2.out", "AZUREOut_aa=1_R=1.out"]
    );
}

#[test]
fn predict_reads_every_data_output_and_leaves_no_workspace_behind() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default());

    let outputs = azr.predict(&[2.5, 30000.0, 1.1]).expect("prediction");
    assert_eq!(outputs.len(), 2);
    for output in &outputs {
        assert_eq!(output.xs_com_fit, vec![2.5]);
        assert_eq!(output.angle_com, vec![90.0]);
        assert_eq!(output.sf_err_com_data, vec![0.2]);
    }

    let observed = azr.solver().observations();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].mode, RunMode::CalculateWithData);
    assert!(observed[0].output_dir_line.contains("output_azr-"));
    assert_eq!(observed[0].ext_capture_file, None);
    assert_eq!(entries(&temp.path().join("runs")), 0);
}

#[test]
fn predict_tables_and_rwas_come_from_one_run() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default());

    let tables = azr.predict_tables(&[2.4, 30000.0, 1.0]).expect("tables");
    assert_eq!(tables[0].column_count(), 9);

    let (outputs, rwas) = azr
        .predict_with_rwas(&[2.6, 30000.0, 1.0])
        .expect("outputs and amplitudes");
    assert_eq!(outputs[0].xs_com_fit, vec![2.6]);
    assert_eq!(rwas.len(), 2);
    assert_eq!(rwas[0].spin_parity, SpinParity::new(0.5, 1));
    assert_eq!(rwas[0].value, 2.6);
    assert_eq!(azr.solver().observations().len(), 2);
}

#[test]
fn rwas_follow_theta() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default());

    let rwas = azr.rwas(&[3.1, 30000.0, 1.0]).expect("amplitudes");
    assert_eq!(rwas[0].value, 3.1);
    assert_eq!(rwas[1].spin_parity, SpinParity::new(0.5, -1));
    assert_eq!(rwas[1].value, 0.75);
}

#[test]
fn wrong_theta_length_fails_before_any_workspace_exists() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default());

    let error = azr.predict(&[2.5, 30000.0]).expect_err("norm is missing");
    assert_eq!(error.category(), AzrErrorCategory::ShapeMismatch);
    assert!(azr.solver().observations().is_empty());

    let error = azr
        .extrapolate(&[2.5, 30000.0, 1.0, 4.0], None)
        .expect_err("one value too many");
    assert_eq!(error.placeholder(), "SHAPE.THETA");
    assert_eq!(entries(&temp.path().join("runs")), 0);
}

#[test]
fn solver_failure_reports_theta_and_workspace_then_cleans_up() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FailingSolver);

    let error = azr.predict(&[2.5, 30000.0, 1.0]).expect_err("solver fails");
    assert_eq!(error.category(), AzrErrorCategory::SolverInvocation);
    assert_eq!(error.placeholder(), "SOLVER.EXIT_STATUS");
    assert!(error.message().contains("theta = [2.5, 30000.0, 1.0]"));
    assert!(error.message().contains("workspace config"));
    assert_eq!(entries(&temp.path().join("runs")), 0);
}

#[test]
fn cleanup_failure_after_a_good_run_reports_theta_and_workspace() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), BlockedDataDirSolver::default());

    let error = azr.rwas(&[2.5, 30000.0, 1.0]).expect_err("data path is a file");
    assert_eq!(error.category(), AzrErrorCategory::IoSystem);
    assert_eq!(error.placeholder(), "IO.WORKSPACE_RELEASE");
    assert!(error.message().contains("theta = [2.5, 30000.0, 1.0]"));
    assert!(error.message().contains("workspace config"));
}

#[test]
fn missing_outputs_are_solver_errors() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(
        temp.path(),
        FakeSolver {
            skip_outputs: true,
            ..FakeSolver::default()
        },
    );

    let error = azr.predict(&[2.5, 30000.0, 1.0]).expect_err("nothing written");
    assert_eq!(error.placeholder(), "SOLVER.MISSING_OUTPUT");
    assert_eq!(entries(&temp.path().join("runs")), 0);
}

#[test]
fn extrapolation_includes_only_the_selected_segments() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default());

    let outputs = azr
        .extrapolate(&[2.5, 30000.0, 1.0], Some(&BTreeSet::from([0])))
        .expect("extrapolation");
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].sf_com_fit, vec![2.5]);

    let observed = azr.solver().observations();
    assert_eq!(observed[0].mode, RunMode::CalculateWithoutData);
    assert_eq!(observed[0].test_flags, vec![true, false, false]);

    let defaults = azr.extrapolate_tables(&[2.5, 30000.0, 1.0], None).expect("defaults");
    assert_eq!(defaults.len(), 2);
    assert_eq!(azr.solver().observations()[1].test_flags, vec![true, true, false]);
    assert!(!azr.config().test().all_segments()[2].include());
}

#[test]
fn extrapolation_rejects_bad_selections_up_front() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default());

    let error = azr
        .extrapolate(&[2.5, 30000.0, 1.0], Some(&BTreeSet::from([3])))
        .expect_err("only three test segments");
    assert_eq!(error.category(), AzrErrorCategory::AddressOutOfBounds);

    let error = azr
        .extrapolate(&[2.5, 30000.0, 1.0], Some(&BTreeSet::new()))
        .expect_err("empty selection");
    assert_eq!(error.placeholder(), "DOCUMENT.NO_TEST_SEGMENTS");
    assert!(azr.solver().observations().is_empty());
}

#[test]
fn explicit_extrapolation_files_apply_without_a_selection() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = evaluator(temp.path(), FakeSolver::default())
        .with_extrap_files(vec!["AZUREOut_aa=1_R=1.extrap".to_string()]);

    let outputs = azr.extrapolate(&[2.5, 30000.0, 1.0], None).expect("extrapolation");
    assert_eq!(outputs.len(), 1);
}

#[test]
fn shifted_capture_integrals_feed_later_evaluations() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut azr = evaluator(temp.path(), FakeSolver::default());

    let error = azr
        .update_ext_capture_integrals(&[0, 1], &[0.01])
        .expect_err("lengths differ");
    assert_eq!(error.placeholder(), "SHAPE.ENERGY_SHIFTS");
    let error = azr
        .update_ext_capture_integrals(&[5], &[0.01])
        .expect_err("no segment 5");
    assert_eq!(error.placeholder(), "ADDRESS.SEGMENT_INDEX");
    assert!(azr.capture_integrals().is_none());

    azr.update_ext_capture_integrals(&[0], &[0.05])
        .expect("integrals update");
    let stored = azr.capture_integrals().expect("stored integrals").to_string();
    let shifted: f64 = stored
        .trim()
        .trim_start_matches("integrals at ")
        .parse()
        .expect("fake integrals carry the first energy");
    assert!((shifted - 0.40).abs() < 1.0e-12);

    azr.predict(&[2.5, 30000.0, 1.0]).expect("prediction");
    let observed = azr.solver().observations();
    let update_run = &observed[0];
    assert!(update_run.ext_capture_file.is_none());
    assert!(update_run.data_filenames[0].contains("data_azr-"));
    assert!((update_run.first_data_energy - 0.40).abs() < 1.0e-12);

    let later = &observed[1];
    assert!(later.ext_capture_file.is_some());
    assert_eq!(later.capture_contents.as_deref(), Some(stored.as_str()));
    assert!(later.data_filenames[1].contains("data_azr-"));
    assert_eq!(entries(&temp.path().join("runs")), 0);

    assert!(azr.config().data().all_segments()[0].filename().ends_with("data/capture.dat"));
}

#[test]
fn failed_capture_update_keeps_data_and_integrals_unchanged() {
    let temp = TempDir::new().expect("tempdir should be created");
    let mut azr = evaluator(temp.path(), FailingSolver);

    let error = azr
        .update_ext_capture_integrals(&[0], &[0.05])
        .expect_err("solver fails");
    assert_eq!(error.placeholder(), "SOLVER.EXIT_STATUS");
    assert!(!azr.config().data().is_modified());
    assert!(azr.capture_integrals().is_none());
    assert_eq!(entries(&temp.path().join("runs")), 0);
}

#[test]
fn concurrent_evaluations_use_distinct_workspaces() {
    let temp = TempDir::new().expect("tempdir should be created");
    let azr = Arc::new(evaluator(temp.path(), FakeSolver::default()));

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let azr = Arc::clone(&azr);
            thread::spawn(move || {
                let energy = 2.0 + index as f64 * 0.1;
                let outputs = azr.predict(&[energy, 30000.0, 1.0]).expect("prediction");
                assert_eq!(outputs[0].xs_com_fit, vec![energy]);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("evaluation thread should finish");
    }

    let mut directories: Vec<String> = azr
        .solver()
        .observations()
        .into_iter()
        .map(|observed| observed.output_dir_line)
        .collect();
    directories.sort();
    directories.dedup();
    assert_eq!(directories.len(), 8);
    assert_eq!(entries(&temp.path().join("runs")), 0);
}

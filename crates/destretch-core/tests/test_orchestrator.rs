mod common;

use std::path::PathBuf;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use destretch_core::error::DestretchError;
use destretch_core::frame::{Frame, IndexConvention};
use destretch_core::io::ImageSource;
use destretch_core::kernel::LocalCorrelationKernel;
use destretch_core::pipeline::config::{DestretchConfig, ReferenceMethod};
use destretch_core::pipeline::{SequenceOrchestrator, SequenceStage};
use destretch_core::reference::{self, MarginComposite, PreviousOutput};
use destretch_core::rolling::{EdgePolicy, Margins};

use common::{blob_field, constant_frame, paths, ramp_frame, MemorySource, MockKernel};

fn small_config() -> DestretchConfig {
    DestretchConfig {
        kernel_sizes: vec![4],
        ..Default::default()
    }
}

fn orchestrator(
    source: Arc<MemorySource>,
    kernel: Arc<MockKernel>,
    config: DestretchConfig,
) -> SequenceOrchestrator {
    SequenceOrchestrator::new(source, kernel, config)
}

// ---------------------------------------------------------------------------
// Ordering and counts
// ---------------------------------------------------------------------------

#[test]
fn test_one_result_per_source_in_order() {
    let (paths, source) = MemorySource::indexed(6, 8, 8);
    let source = Arc::new(source);
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(source.clone(), kernel.clone(), small_config());

    let mut seen = Vec::new();
    let count = orch
        .run(
            &paths,
            &mut PreviousOutput::new(),
            SequenceStage::Destretching,
            |index, result| {
                seen.push((index, result.corrected.data[[0, 0, 0]]));
                Ok(())
            },
        )
        .unwrap();

    assert_eq!(count, 6);
    assert_eq!(seen.iter().map(|s| s.0).collect::<Vec<_>>(), (0..6).collect::<Vec<_>>());
    // The mock adds one to every frame.
    for (i, value) in &seen {
        assert_abs_diff_eq!(*value, *i as f32 + 1.0);
    }
    assert_eq!(source.load_count(), 6);
}

#[test]
fn test_empty_sequence_makes_no_calls() {
    let source = Arc::new(MemorySource::new(vec![]));
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(source, kernel.clone(), small_config());

    let mut calls = 0;
    let count = orch
        .run(&[], &mut PreviousOutput::new(), SequenceStage::Destretching, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(calls, 0);
    assert!(kernel.calls().is_empty());
}

#[test]
fn test_resolution_mismatch_aborts_without_further_results() {
    let paths = paths(6);
    let entries = paths
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let frame = if i == 3 {
                constant_frame(8, 6, 0.0)
            } else {
                constant_frame(8, 8, 0.0)
            };
            (p.clone(), frame)
        })
        .collect();
    let source = Arc::new(MemorySource::new(entries));
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(source.clone(), kernel.clone(), small_config());

    let mut delivered = Vec::new();
    let err = orch
        .run(&paths, &mut PreviousOutput::new(), SequenceStage::Destretching, |i, _| {
            delivered.push(i);
            Ok(())
        })
        .unwrap_err();

    match err {
        DestretchError::ResolutionMismatch { path, expected, found } => {
            assert_eq!(path, PathBuf::from("frame3.fits"));
            assert_eq!(expected, (8, 8));
            assert_eq!(found, (8, 6));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(delivered, vec![0, 1, 2]);
    assert_eq!(kernel.calls().len(), 3);
    assert_eq!(source.load_count(), 4);
}

#[test]
fn test_missing_source_propagates() {
    let (mut paths, source) = MemorySource::indexed(2, 8, 8);
    paths.push(PathBuf::from("missing.fits"));
    let orch = orchestrator(Arc::new(source), Arc::new(MockKernel::default()), small_config());

    let mut delivered = 0;
    let err = orch
        .run(&paths, &mut PreviousOutput::new(), SequenceStage::Destretching, |_, _| {
            delivered += 1;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, DestretchError::Io(_)));
    assert_eq!(delivered, 2);
}

#[test]
fn test_invalid_kernel_sizes_rejected_before_loading() {
    for sizes in [vec![], vec![8, 0]] {
        let (paths, source) = MemorySource::indexed(3, 8, 8);
        let source = Arc::new(source);
        let config = DestretchConfig {
            kernel_sizes: sizes,
            ..Default::default()
        };
        let orch = orchestrator(source.clone(), Arc::new(MockKernel::default()), config);
        let err = orch
            .run(&paths, &mut PreviousOutput::new(), SequenceStage::Destretching, |_, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, DestretchError::Configuration(_)));
        assert_eq!(source.load_count(), 0);
    }
}

#[test]
fn test_sink_error_stops_the_run() {
    let (paths, source) = MemorySource::indexed(4, 8, 8);
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(Arc::new(source), kernel.clone(), small_config());

    let err = orch
        .run(&paths, &mut PreviousOutput::new(), SequenceStage::Destretching, |i, _| {
            if i == 1 {
                Err(DestretchError::UnsupportedOutput("disk full".into()))
            } else {
                Ok(())
            }
        })
        .unwrap_err();
    assert!(matches!(err, DestretchError::UnsupportedOutput(_)));
    assert_eq!(kernel.calls().len(), 2);
}

// ---------------------------------------------------------------------------
// Reference strategies
// ---------------------------------------------------------------------------

#[test]
fn test_previous_output_chains_corrected_frames() {
    let paths = paths(4);
    let entries = paths
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone(), ramp_frame(8, 8, i as f32 * 3.0)))
        .collect();
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(Arc::new(MemorySource::new(entries)), kernel.clone(), small_config());

    let mut corrected: Vec<Frame> = Vec::new();
    orch.run(&paths, &mut PreviousOutput::new(), SequenceStage::Destretching, |_, r| {
        corrected.push(r.corrected);
        Ok(())
    })
    .unwrap();

    let calls = kernel.calls();
    // Position 0 falls back to the first raw frame.
    assert_eq!(calls[0].reference, calls[0].frame);
    for i in 1..calls.len() {
        assert_eq!(calls[i].reference, corrected[i - 1], "position {i}");
    }
}

#[test]
fn test_zero_mean_normalizes_frame_and_reference() {
    let (paths, source) = MemorySource::indexed(3, 8, 8);
    let kernel = Arc::new(MockKernel::default());
    let config = DestretchConfig {
        zero_mean: true,
        ..small_config()
    };
    let orch = orchestrator(Arc::new(source), kernel.clone(), config);
    orch.run(&paths, &mut PreviousOutput::new(), SequenceStage::Destretching, |_, _| Ok(()))
        .unwrap();

    for call in kernel.calls() {
        assert_abs_diff_eq!(call.frame.mean(), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(call.reference.mean(), 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_margin_composite_whole_sequence_median() {
    let (paths, source) = MemorySource::indexed(5, 8, 8);
    let source = Arc::new(source);
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(source.clone(), kernel.clone(), small_config());

    let mut strategy = MarginComposite::new(
        source.clone(),
        paths.clone(),
        IndexConvention::Tyx,
        None,
        EdgePolicy::KeepRange,
    );
    orch.run(&paths, &mut strategy, SequenceStage::Destretching, |_, _| Ok(()))
        .unwrap();

    let calls = kernel.calls();
    assert_eq!(calls.len(), 5);
    for (i, call) in calls.iter().enumerate() {
        // Median of 0..5 is 2 everywhere.
        assert_eq!(call.reference, constant_frame(8, 8, 2.0));
        assert_eq!(call.frame, constant_frame(8, 8, i as f32));
    }
    // The composite loads each frame once and serves the originals itself.
    assert_eq!(source.load_count(), 5);
}

#[test]
fn test_margin_composite_follows_window() {
    let (paths, source) = MemorySource::indexed(6, 8, 8);
    let source: Arc<MemorySource> = Arc::new(source);
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(source.clone(), kernel.clone(), small_config());

    let mut strategy = MarginComposite::new(
        source,
        paths.clone(),
        IndexConvention::Tyx,
        Some(Margins::new(1, 1).unwrap()),
        EdgePolicy::KeepRange,
    );
    orch.run(&paths, &mut strategy, SequenceStage::Destretching, |_, _| Ok(()))
        .unwrap();

    // Full [start, end) medians: [0,3) [0,3) [1,4) [2,5) [3,6) [3,6).
    let expected = [1.0, 1.0, 2.0, 3.0, 4.0, 4.0];
    for (call, value) in kernel.calls().iter().zip(expected) {
        assert_eq!(call.reference, constant_frame(8, 8, value));
    }
}

#[test]
fn test_margin_composite_checks_resolution() {
    let paths = paths(3);
    let entries = vec![
        (paths[0].clone(), constant_frame(8, 8, 0.0)),
        (paths[1].clone(), constant_frame(6, 8, 0.0)),
        (paths[2].clone(), constant_frame(8, 8, 0.0)),
    ];
    let source = Arc::new(MemorySource::new(entries));
    let orch = orchestrator(source.clone(), Arc::new(MockKernel::default()), small_config());
    let mut strategy =
        MarginComposite::new(source, paths.clone(), IndexConvention::Tyx, None, EdgePolicy::KeepRange);

    let err = orch
        .run(&paths, &mut strategy, SequenceStage::Destretching, |_, _| Ok(()))
        .unwrap_err();
    assert!(matches!(
        err,
        DestretchError::ResolutionMismatch { ref path, .. } if path == &paths[1]
    ));
}

#[test]
fn test_strategy_from_config() {
    let (paths, source) = MemorySource::indexed(2, 8, 8);
    let source: Arc<dyn ImageSource> = Arc::new(source);

    let previous =
        reference::from_method(&ReferenceMethod::PreviousOutput, source.clone(), &paths, IndexConvention::Tyx)
            .unwrap();
    assert_eq!(previous.name(), "previous output");

    let composite = reference::from_method(
        &ReferenceMethod::MarginComposite {
            margins: Some([1, 2]),
            edge_policy: EdgePolicy::TrimMargins,
        },
        source.clone(),
        &paths,
        IndexConvention::Tyx,
    )
    .unwrap();
    assert_eq!(composite.name(), "margin composite");

    let bad = reference::from_method(
        &ReferenceMethod::MarginComposite {
            margins: Some([-1, 2]),
            edge_policy: EdgePolicy::KeepRange,
        },
        source,
        &paths,
        IndexConvention::Tyx,
    );
    assert!(matches!(bad, Err(DestretchError::Configuration(_))));
}

// ---------------------------------------------------------------------------
// Offset application
// ---------------------------------------------------------------------------

fn apply_fixture(n_offsets: usize, field_rows: usize) -> (Vec<PathBuf>, Vec<PathBuf>, Vec<PathBuf>, MemorySource) {
    let data: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("d{i}.fits"))).collect();
    let offsets: Vec<PathBuf> = (0..n_offsets).map(|i| PathBuf::from(format!("o{i}.off.fits"))).collect();
    let averages: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("{i}.avg.fits"))).collect();

    let field = |v: f32| Frame::new(ndarray::Array3::from_elem((2, field_rows, 3), v));
    let mut entries = Vec::new();
    for (i, p) in data.iter().enumerate() {
        entries.push((p.clone(), ramp_frame(8, 8, i as f32)));
    }
    for p in &offsets {
        entries.push((p.clone(), field(0.75)));
    }
    for p in &averages {
        entries.push((p.clone(), field(0.75)));
    }
    (data, offsets, averages, MemorySource::new(entries))
}

#[test]
fn test_apply_with_zero_residual_only_removes_mean() {
    let (data, offsets, averages, source) = apply_fixture(3, 3);
    let orch = orchestrator(Arc::new(source), Arc::new(MockKernel::default()), small_config());

    let mut results = Vec::new();
    let count = orch
        .run_apply(&data, &offsets, &averages, |i, r| {
            results.push((i, r));
            Ok(())
        })
        .unwrap();
    assert_eq!(count, 3);

    for (i, result) in &results {
        let mut expected = ramp_frame(8, 8, *i as f32);
        expected.subtract_mean();
        for (a, b) in result.corrected.data.iter().zip(expected.data.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
        }
        assert!(result.displacement_sum.is_none());
        assert!(result.reference_displacement_sum.is_none());
        assert_eq!(result.params.kernel_size, 4);
    }
}

#[test]
fn test_apply_warps_by_offset_minus_average() {
    let data = vec![PathBuf::from("d0.fits")];
    let offsets = vec![PathBuf::from("o0.off.fits")];
    let averages = vec![PathBuf::from("0.avg.fits")];
    let field = |v: f32| Frame::new(ndarray::Array3::from_elem((2, 3, 3), v));
    let source = MemorySource::new(vec![
        (data[0].clone(), ramp_frame(8, 8, 0.0)),
        (offsets[0].clone(), field(1.0)),
        (averages[0].clone(), field(0.25)),
    ]);
    let kernel = Arc::new(MockKernel::default());
    let orch = orchestrator(Arc::new(source), kernel.clone(), small_config());

    orch.run_apply(&data, &offsets, &averages, |_, _| Ok(())).unwrap();

    let applied = kernel.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].data.shape(), &[2, 3, 3]);
    for v in applied[0].data.iter() {
        assert_abs_diff_eq!(*v, 0.75, epsilon = 1e-6);
    }
}

#[test]
fn test_apply_count_mismatch_rejected_before_loading() {
    let (data, offsets, averages, source) = apply_fixture(2, 3);
    let source = Arc::new(source);
    let orch = orchestrator(source.clone(), Arc::new(MockKernel::default()), small_config());

    let err = orch
        .run_apply(&data, &offsets, &averages, |_, _| Ok(()))
        .unwrap_err();
    assert!(matches!(err, DestretchError::Configuration(_)));
    assert_eq!(source.load_count(), 0);
}

#[test]
fn test_apply_field_grid_must_match_frame() {
    // An 8x8 frame with kernel 4 has a 3x3 grid; a 4-row field does not fit.
    let (data, offsets, averages, source) = apply_fixture(3, 4);
    let orch = orchestrator(Arc::new(source), Arc::new(MockKernel::default()), small_config());

    let err = orch
        .run_apply(&data, &offsets, &averages, |_, _| Ok(()))
        .unwrap_err();
    assert!(matches!(err, DestretchError::RegistrationPrecondition(_)));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn test_repeated_runs_are_identical() {
    let paths = paths(3);
    let entries = paths
        .iter()
        .enumerate()
        .map(|(i, p)| (p.clone(), blob_field(48, 48, i as f64 * 0.7, -(i as f64) * 0.4)))
        .collect();
    let source: Arc<dyn ImageSource> = Arc::new(MemorySource::new(entries));
    let config = DestretchConfig {
        kernel_sizes: vec![24, 16],
        ..Default::default()
    };

    let run_once = || {
        let orch = SequenceOrchestrator::new(
            source.clone(),
            Arc::new(LocalCorrelationKernel::default()),
            config.clone(),
        );
        let mut out = Vec::new();
        orch.run(&paths, &mut PreviousOutput::new(), SequenceStage::Destretching, |_, r| {
            let offsets = r.offsets();
            out.push((r.corrected, offsets));
            Ok(())
        })
        .unwrap();
        out
    };

    let first = run_once();
    let second = run_once();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

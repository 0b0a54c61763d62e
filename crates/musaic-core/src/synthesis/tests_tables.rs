//! Tests for control tables and parameter validation.

use super::*;
use crate::control::{ControlParameter, WindowKind};
use crate::error::ErrorKind;
use crate::rng::create_rng;

#[test]
fn test_mix_weights_split_evenly() {
    let table = corpus_weight_table(&CorpusWeights::Mix(0.6.into()), 2, 2).unwrap();
    assert!(!table.per_source);
    for row in &table.rows {
        assert_eq!(row.len(), 3);
        assert!((row[0] - 0.4 / 1.6).abs() < 1e-12);
        assert!((row[1] - 0.6 / 1.6).abs() < 1e-12);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_full_corpus_weight_leaves_nothing_for_target() {
    let table = corpus_weight_table(&CorpusWeights::default(), 4, 1).unwrap();
    assert!(table.rows.iter().all(|row| row == &vec![0.0, 1.0]));
}

#[test]
fn test_per_source_rows_are_clamped_and_normalized() {
    let weights = CorpusWeights::PerSource(vec![
        ControlParameter::Constant(0.0),
        ControlParameter::Constant(3.0),
        ControlParameter::Constant(1.0),
    ]);
    let table = corpus_weight_table(&weights, 1, 2).unwrap();
    assert!(table.per_source);
    assert_eq!(table.rows[0], vec![0.0, 0.5, 0.5]);
}

#[test]
fn test_zero_row_goes_to_target() {
    let weights = CorpusWeights::PerSource(vec![
        ControlParameter::Constant(0.0),
        ControlParameter::Constant(-1.0),
    ]);
    let table = corpus_weight_table(&weights, 2, 1).unwrap();
    assert_eq!(table.rows[1], vec![1.0, 0.0]);
}

#[test]
fn test_win_lengths_round_to_resolution() {
    let lengths = win_length_table(&ControlParameter::Constant(0.1), 2, 16000, 512).unwrap();
    // 1600 samples round to 3 * 512
    assert_eq!(lengths, vec![1536, 1536]);

    let negative = win_length_table(&ControlParameter::Constant(-1.0), 1, 16000, 512).unwrap();
    assert_eq!(negative, vec![0]);
}

#[test]
fn test_onsets_accumulate_stretched_hops() {
    let onsets = onset_table(
        &ControlParameter::Constant(2.0),
        &ControlParameter::Constant(0.0),
        4,
        512,
        16000,
        &mut create_rng(1),
    )
    .unwrap();
    assert_eq!(onsets, vec![0, 1024, 2048, 3072]);
}

#[test]
fn test_onset_jitter_stays_in_range() {
    let onsets = onset_table(
        &ControlParameter::Constant(1.0),
        &ControlParameter::Constant(0.1),
        200,
        512,
        16000,
        &mut create_rng(5),
    )
    .unwrap();
    for (n, onset) in onsets.iter().enumerate() {
        let nominal = (n * 512) as i64;
        // a quarter of 0.1 s at 16 kHz is 400 samples
        assert!((*onset as i64 - nominal).abs() <= 400, "segment {}", n);
    }
    assert!(onsets.iter().enumerate().any(|(n, o)| *o != n * 512));
}

#[test]
fn test_pan_gains_sum_to_one() {
    let pans = pan_table(&ControlParameter::Constant(5.0), 50, 4, &mut create_rng(3)).unwrap();
    for gains in &pans {
        assert_eq!(gains.len(), 4);
        assert!((gains.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }
}

#[test]
fn test_mono_pan_is_unity() {
    let pans = pan_table(&ControlParameter::Constant(5.0), 3, 1, &mut create_rng(3)).unwrap();
    assert!(pans.iter().all(|g| g == &vec![1.0]));
}

#[test]
fn test_zero_pan_depth_is_equal_power_split() {
    let pans = pan_table(&ControlParameter::Constant(0.0), 3, 2, &mut create_rng(3)).unwrap();
    assert!(pans.iter().all(|g| g == &vec![0.5, 0.5]));
}

#[test]
fn test_window_bank_lookup() {
    let bank = WindowBank::new(&WindowKind::Hann.into(), [1024, 512, 1024, 0]).unwrap();
    assert_eq!(bank.len(), 2);
    assert_eq!(bank.get(1024).map(<[f32]>::len), Some(1024));
    assert_eq!(bank.get(512).map(<[f32]>::len), Some(512));
    assert!(bank.get(0).is_none());
    assert!(bank.get(1536).is_none());
}

#[test]
fn test_window_bank_renders_only_requested_lengths() {
    // ten seconds at 44.1 kHz, without the shorter multiples below it
    let longest = 440_832;
    let bank = WindowBank::new(&WindowKind::Tukey.into(), [longest, longest]).unwrap();
    assert_eq!(bank.len(), 1);
    assert_eq!(bank.get(longest).map(<[f32]>::len), Some(longest));
    assert!(bank.get(longest - 512).is_none());

    let empty = WindowBank::new(&WindowKind::Hann.into(), []).unwrap();
    assert!(empty.is_empty());
}

#[test]
fn test_weight_table_reports_target_use() {
    let wet = corpus_weight_table(&CorpusWeights::default(), 3, 2).unwrap();
    assert!(!wet.uses_target());

    let breakpoints = ControlParameter::from_values(&[1.0, 0.0]).unwrap();
    let fading = corpus_weight_table(&CorpusWeights::Mix(breakpoints), 3, 1).unwrap();
    assert!(fading.uses_target());
}

#[test]
fn test_validate_static_parameters() {
    let params = SynthesisParams {
        n_chans: 0,
        ..Default::default()
    };
    assert_eq!(params.validate(1).unwrap_err().kind(), ErrorKind::Configuration);

    let params = SynthesisParams {
        win_length_res: 0,
        ..Default::default()
    };
    assert!(params.validate(1).is_err());

    let params = SynthesisParams {
        sample_rate: Some(0),
        ..Default::default()
    };
    assert!(params.validate(1).is_err());
}

#[test]
fn test_validate_per_source_length() {
    let params = SynthesisParams {
        corpus_weights: CorpusWeights::PerSource(vec![0.5.into(), 0.5.into()]),
        ..Default::default()
    };
    assert!(params.validate(1).is_ok());
    let err = params.validate(2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("corpus_weights"));
}

#[test]
fn test_params_from_json() {
    let params: SynthesisParams = serde_json::from_str(
        r#"{
            "fidelity": [1, 0],
            "grain_env": "hann",
            "corpus_weights": [0, "tukey", 1],
            "n_chans": 1,
            "seed": 7
        }"#,
    )
    .unwrap();
    assert_eq!(params.grain_env, ControlParameter::NamedWindow(WindowKind::Hann));
    assert!(matches!(params.corpus_weights, CorpusWeights::PerSource(ref w) if w.len() == 3));
    assert_eq!(params.seed, Some(7));
    assert_eq!(params.win_length_res, DEFAULT_WIN_LENGTH_RES);

    let mix: SynthesisParams = serde_json::from_str(r#"{"corpus_weights": [0.2, 0.8]}"#).unwrap();
    assert!(matches!(mix.corpus_weights, CorpusWeights::Mix(_)));

    assert!(serde_json::from_str::<SynthesisParams>(r#"{"grain_size": 1}"#).is_err());
}

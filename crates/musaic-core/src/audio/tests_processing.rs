//! Tests for normalization and resampling.

use super::*;

#[test]
fn test_normalize_to_headroom() {
    let mut samples = vec![0.5, -0.3, 0.8, -0.2];
    normalize_peak(&mut samples, HEADROOM_GAIN);

    let target = 0.5_f32.sqrt();
    assert!((peak(&samples) - target).abs() < 1e-6);
}

#[test]
fn test_normalize_silent_audio() {
    let mut samples = vec![0.0; 4];
    normalize_peak(&mut samples, HEADROOM_GAIN);

    // Silent audio should remain silent (no division by zero)
    assert!(samples.iter().all(|&s| s == 0.0));
}

#[test]
fn test_normalize_keeps_relative_levels() {
    let mut samples = vec![2.0, -1.0, 0.5];
    normalize_peak(&mut samples, 1.0);
    assert_eq!(samples, vec![1.0, -0.5, 0.25]);
}

#[test]
fn test_resample_linear_endpoints() {
    let samples = vec![0.0, 1.0, 2.0, 3.0];
    let out = resample_linear(&samples, 7);
    assert_eq!(out.len(), 7);
    assert_eq!(out[0], 0.0);
    assert_eq!(out[6], 3.0);
    assert!((out[1] - 0.5).abs() < 1e-6);
}

#[test]
fn test_resample_linear_downsample() {
    let samples: Vec<f32> = (0..9).map(|i| i as f32).collect();
    let out = resample_linear(&samples, 5);
    assert_eq!(out, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
}

#[test]
fn test_resample_to_rate_length() {
    let samples = vec![0.25; 1000];
    assert_eq!(resample_to_rate(&samples, 16000, 32000).len(), 2000);
    assert_eq!(resample_to_rate(&samples, 16000, 8000).len(), 500);
    assert_eq!(resample_to_rate(&samples, 16000, 16000).len(), 1000);
}

#[test]
fn test_mix_to_mono() {
    let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
    assert_eq!(mix_to_mono(&interleaved, 2), vec![0.5, 0.5, 0.0]);
}

#[test]
fn test_truncate_to_duration() {
    let mut samples = vec![0.0; 1000];
    truncate_to_duration(&mut samples, 100, Some(2.5));
    assert_eq!(samples.len(), 250);

    let mut untouched = vec![0.0; 10];
    truncate_to_duration(&mut untouched, 100, None);
    assert_eq!(untouched.len(), 10);
}

#[test]
fn test_deferred_source_uses_loader() {
    use std::path::Path;

    struct Fixed;
    impl AudioLoader for Fixed {
        fn load(
            &self,
            _path: &Path,
            _max_duration: Option<f64>,
        ) -> crate::error::CoreResult<DecodedAudio> {
            Ok(DecodedAudio {
                samples: vec![0.1; 200],
                sample_rate: 200,
            })
        }
    }

    let source = SourceFile::deferred("a.wav", 100);
    let samples = source.resolve(Path::new("/root"), Some(1.0), &Fixed).unwrap();
    // resampled to the recorded native rate, then truncated to one second
    assert_eq!(samples.len(), 100);
}

#[test]
fn test_embedded_only_reports_missing() {
    use crate::error::ErrorKind;
    use std::path::Path;

    let source = SourceFile::deferred("gone.wav", 44100);
    let err = source
        .resolve(Path::new("/nowhere"), None, &EmbeddedOnly)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceMissing);
}

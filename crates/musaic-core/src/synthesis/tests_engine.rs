//! Tests for grain selection and rendering.

use std::path::{Path, PathBuf};

use super::*;
use crate::analysis::{AnalysisConfig, FeatureFrame};
use crate::audio::{AudioLoader, DecodedAudio, EmbeddedOnly, SourceFile};
use crate::corpus::{Corpus, CorpusSettings};
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::mosaic::{CorpusId, Mosaic};
use crate::persist::Persistable;

const SR: u32 = 16000;
const HOP: usize = 512;

fn config() -> AnalysisConfig {
    AnalysisConfig {
        n_mfcc: 2,
        hop_length: HOP,
        ..Default::default()
    }
}

fn tone(len: usize, freq: f32) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin() * 0.5)
        .collect()
}

fn corpus(name: &str, freq: f32, offset: f64) -> Corpus {
    let source = SourceFile::loaded(format!("/sounds/{}.wav", name), SR, tone(16000, freq));
    let frames = (0..28)
        .map(|i| {
            FeatureFrame::new(
                (i * HOP) as u64,
                vec![i as f64 + offset, ((i * 3) % 28) as f64],
            )
        })
        .collect();
    let settings = CorpusSettings {
        seed: Some(1),
        analysis: config(),
        ..Default::default()
    };
    Corpus::from_frames(vec![source], vec![frames], &settings).unwrap()
}

fn target_frames(count: usize) -> Vec<FeatureFrame> {
    (0..count)
        .map(|i| FeatureFrame::new((i * HOP) as u64, vec![i as f64 * 2.0 + 0.2, (i % 5) as f64]))
        .collect()
}

fn mosaic_from(corpora: &[Corpus]) -> Mosaic {
    let target = SourceFile::loaded("/targets/voice.wav", SR, tone(8000, 220.0));
    Mosaic::build(target, target_frames(13), corpora, &config()).unwrap()
}

fn params(seed: u32) -> SynthesisParams {
    SynthesisParams::default().with_seed(seed)
}

/// Serves tones for known paths; every other file is missing.
struct ToneLoader {
    files: Vec<(PathBuf, f32)>,
}

impl ToneLoader {
    /// Knows the corpus source of `corpus("a", 440.0, _)` but not the target.
    fn corpus_only() -> Self {
        Self {
            files: vec![(PathBuf::from("/sounds/a.wav"), 440.0)],
        }
    }
}

impl AudioLoader for ToneLoader {
    fn load(&self, path: &Path, _max_duration: Option<f64>) -> CoreResult<DecodedAudio> {
        self.files
            .iter()
            .find(|(known, _)| known.as_path() == path)
            .map(|&(_, freq)| DecodedAudio {
                samples: tone(16000, freq),
                sample_rate: SR,
            })
            .ok_or_else(|| CoreError::missing(path))
    }
}

#[test]
fn test_best_match_at_full_fidelity() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let render = SynthesisEngine::new(&mosaic, &params(3))
        .unwrap()
        .render(&EmbeddedOnly)
        .unwrap();

    assert_eq!(render.grains.len(), 13);
    for report in &render.grains {
        let best = mosaic.frames()[report.segment][0].grain;
        assert_eq!(report.grain, Some(best));
        assert_eq!(report.amp, 1.0);
        assert_eq!(report.status, GrainStatus::Rendered);
    }
    assert_eq!(render.passthrough(), 0);
}

#[test]
fn test_peak_is_normalized() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let buffer = mosaic.to_audio(&params(11), &EmbeddedOnly).unwrap();
    assert!((buffer.peak() - 0.5_f32.sqrt()).abs() < 1e-6);
    assert_eq!(buffer.channels(), 2);
    assert_eq!(buffer.sample_rate(), SR);
}

#[test]
fn test_output_length() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let buffer = mosaic.to_audio(&params(1), &EmbeddedOnly).unwrap();
    // last onset 12 * 512, plus 0.1 s rounded to 3 * 512
    assert_eq!(buffer.num_frames(), 12 * 512 + 1536);

    let doubled = SynthesisParams {
        sample_rate: Some(2 * SR),
        ..params(1)
    };
    let buffer = mosaic.to_audio(&doubled, &EmbeddedOnly).unwrap();
    assert_eq!(buffer.sample_rate(), 2 * SR);
    assert_eq!(buffer.num_frames(), 12 * 1024 + 3072);
}

#[test]
fn test_same_seed_same_output() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let loose = SynthesisParams {
        fidelity: 0.3.into(),
        onset_var: 0.02.into(),
        ..params(99)
    };
    let a = mosaic.to_audio(&loose, &EmbeddedOnly).unwrap();
    let b = mosaic.to_audio(&loose, &EmbeddedOnly).unwrap();
    assert_eq!(a.samples(), b.samples());

    let other = SynthesisParams {
        seed: Some(100),
        ..loose
    };
    let c = mosaic.to_audio(&other, &EmbeddedOnly).unwrap();
    assert_ne!(a.samples(), c.samples());
}

#[test]
fn test_low_fidelity_widens_choice() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let loose = SynthesisParams {
        fidelity: 0.0.into(),
        ..params(5)
    };
    let render = SynthesisEngine::new(&mosaic, &loose)
        .unwrap()
        .render(&EmbeddedOnly)
        .unwrap();
    let not_best = render
        .grains
        .iter()
        .filter(|r| r.grain != Some(mosaic.frames()[r.segment][0].grain))
        .count();
    assert!(not_best > 0);
}

#[test]
fn test_zero_corpus_weight_passes_target_through() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let dry = SynthesisParams {
        corpus_weights: CorpusWeights::Mix(0.0.into()),
        ..params(2)
    };
    let render = SynthesisEngine::new(&mosaic, &dry)
        .unwrap()
        .render(&EmbeddedOnly)
        .unwrap();
    for report in &render.grains {
        assert!(report.is_passthrough());
        assert_eq!(report.amp, 1.0);
        let grain = report.grain.unwrap();
        assert_eq!(grain.marker, (report.segment * HOP) as u64);
        assert_eq!(report.status, GrainStatus::Rendered);
    }
}

#[test]
fn test_per_source_weights_pick_one_corpus() {
    let corpora = [corpus("a", 440.0, 0.0), corpus("b", 660.0, 0.5)];
    let mosaic = mosaic_from(&corpora);
    for (weights, expected) in [([0.0, 1.0, 0.0], 0), ([0.0, 0.0, 1.0], 1)] {
        let params = SynthesisParams {
            corpus_weights: CorpusWeights::PerSource(
                weights.iter().map(|&w| w.into()).collect(),
            ),
            fidelity: 0.5.into(),
            ..params(8)
        };
        let render = SynthesisEngine::new(&mosaic, &params)
            .unwrap()
            .render(&EmbeddedOnly)
            .unwrap();
        for report in &render.grains {
            assert_eq!(report.grain.unwrap().corpus_id, CorpusId::Corpus(expected));
        }
    }
}

#[test]
fn test_wrong_weight_count_is_configuration_error() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let params = SynthesisParams {
        corpus_weights: CorpusWeights::PerSource(vec![0.5.into(), 0.5.into(), 0.5.into()]),
        ..params(1)
    };
    let err = mosaic.to_audio(&params, &EmbeddedOnly).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_grain_at_source_end_is_skipped() {
    let source = SourceFile::loaded("/sounds/short.wav", SR, tone(16000, 440.0));
    let frames = (0..20)
        .map(|i| FeatureFrame::new(15999, vec![i as f64, 0.0]))
        .collect();
    let settings = CorpusSettings {
        seed: Some(4),
        analysis: config(),
        ..Default::default()
    };
    let corpus = Corpus::from_frames(vec![source], vec![frames], &settings).unwrap();
    let mosaic = mosaic_from(&[corpus]);

    let long_grains = SynthesisParams {
        grain_dur: 1.0.into(),
        ..params(6)
    };
    let render = SynthesisEngine::new(&mosaic, &long_grains)
        .unwrap()
        .render(&EmbeddedOnly)
        .unwrap();
    assert!(render
        .grains
        .iter()
        .all(|r| r.status == GrainStatus::OutOfBounds && r.len == 0));
    assert_eq!(render.buffer.energy(), 0.0);
}

#[test]
fn test_empty_mosaic_renders_empty_buffer() {
    let target = SourceFile::loaded("/targets/click.wav", SR, vec![0.0; 100]);
    let mosaic = Mosaic::build(target, Vec::new(), &[corpus("a", 440.0, 0.0)], &config()).unwrap();
    let buffer = mosaic.to_audio(&params(1), &EmbeddedOnly).unwrap();
    assert!(buffer.is_empty());
}

#[test]
fn test_deferred_sources_fail_only_at_render() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let restored = Mosaic::from_json(&mosaic.to_json(false).unwrap()).unwrap();
    assert_eq!(restored.frames(), mosaic.frames());

    let err = restored.to_audio(&params(1), &EmbeddedOnly).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceMissing);
}

#[test]
fn test_mono_output() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let mono = SynthesisParams {
        n_chans: 1,
        grain_env: crate::control::WindowKind::Hann.into(),
        ..params(4)
    };
    let buffer = mosaic.to_audio(&mono, &EmbeddedOnly).unwrap();
    assert_eq!(buffer.channels(), 1);
    assert!((buffer.peak() - 0.5_f32.sqrt()).abs() < 1e-6);
}

#[test]
fn test_portable_write_requires_loaded_sources() {
    let original = corpus("a", 440.0, 0.0);
    let restored = Corpus::from_json(&original.to_json(false).unwrap()).unwrap();
    assert!(!restored.sources()[0].audio.is_loaded());

    let err = restored.to_json(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let embedded = restored.embedded(&ToneLoader::corpus_only()).unwrap();
    assert!(embedded.sources()[0].audio.is_loaded());
    assert!(!restored.sources()[0].audio.is_loaded());
    let portable = Corpus::from_json(&embedded.to_json(true).unwrap()).unwrap();
    assert!(portable.sources()[0].audio.is_loaded());
}

#[test]
fn test_portable_mosaic_over_deferred_corpus_renders_embedded() {
    let original = corpus("a", 440.0, 0.0);
    let restored = Corpus::from_json(&original.to_json(false).unwrap()).unwrap();
    let mosaic = mosaic_from(&[restored]);

    let err = mosaic.to_json(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let embedded = mosaic.embedded(&ToneLoader::corpus_only()).unwrap();
    let portable = Mosaic::from_json(&embedded.to_json(true).unwrap()).unwrap();
    let rendered = portable.to_audio(&params(1), &EmbeddedOnly).unwrap();
    let expected = mosaic_from(&[original])
        .to_audio(&params(1), &EmbeddedOnly)
        .unwrap();
    assert_eq!(rendered.samples(), expected.samples());
}

#[test]
fn test_target_loaded_only_when_it_can_play() {
    let mosaic = mosaic_from(&[corpus("a", 440.0, 0.0)]);
    let deferred = Mosaic::from_json(&mosaic.to_json(false).unwrap()).unwrap();
    let loader = ToneLoader::corpus_only();

    let render = SynthesisEngine::new(&deferred, &params(2))
        .unwrap()
        .render(&loader)
        .unwrap();
    assert_eq!(render.passthrough(), 0);
    assert_eq!(render.rendered(), 13);

    let mixed = SynthesisParams {
        corpus_weights: CorpusWeights::Mix(0.5.into()),
        ..params(2)
    };
    let err = deferred.to_audio(&mixed, &loader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceMissing);
}

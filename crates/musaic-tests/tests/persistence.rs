//! Snapshot persistence tests.
//!
//! Portable snapshots embed audio and render without touching the disk;
//! non-portable snapshots defer audio until rendering.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p musaic-tests --test persistence
//! ```

use musaic_cli::audio_io::WavLoader;
use musaic_core::{
    Corpus, CorpusSettings, CorpusWeights, EmbeddedOnly, ErrorKind, Mosaic, Persistable,
    SnapshotHeader, SynthesisParams,
};
use musaic_features::SpectralAnalyzer;
use musaic_tests::{buffer_hash, AudioFixture};
use pretty_assertions::assert_eq;

fn build(fixture: &AudioFixture) -> (Corpus, Mosaic) {
    let corpus = Corpus::build(
        fixture.corpus_sources(),
        &SpectralAnalyzer::new(),
        &CorpusSettings {
            seed: Some(11),
            ..Default::default()
        },
    )
    .unwrap();
    let mosaic = Mosaic::analyze(
        fixture.target(),
        std::slice::from_ref(&corpus),
        &SpectralAnalyzer::new(),
    )
    .unwrap();
    (corpus, mosaic)
}

fn params() -> SynthesisParams {
    SynthesisParams {
        fidelity: 0.6.into(),
        ..SynthesisParams::default().with_seed(99)
    }
}

#[test]
fn test_corpus_round_trip_preserves_queries() {
    let fixture = AudioFixture::new();
    let (corpus, mosaic) = build(&fixture);
    let path = fixture.path().join("corpus.json");

    for portable in [true, false] {
        corpus.write_json(&path, portable).unwrap();
        let restored = Corpus::read_json(&path).unwrap();
        assert_eq!(restored.num_frames(), corpus.num_frames());
        assert_eq!(restored.source_root(), corpus.source_root());
        assert_eq!(restored.sources()[0].audio.is_loaded(), portable);

        let query = &corpus.index().entries()[5].vector;
        assert_eq!(
            restored.index().knn(query, 10).unwrap(),
            corpus.index().knn(query, 10).unwrap()
        );
        if portable {
            assert_eq!(restored.summarize(), corpus.summarize());
        }
    }

    // a rebuilt mosaic over the restored corpus matches the original
    let restored = Corpus::read_json(&path).unwrap();
    let rebuilt = Mosaic::analyze(fixture.target(), &[restored], &SpectralAnalyzer::new()).unwrap();
    assert_eq!(rebuilt.frames(), mosaic.frames());
}

#[test]
fn test_portable_mosaic_renders_without_files() {
    let fixture = AudioFixture::new();
    let (_, mosaic) = build(&fixture);
    let path = fixture.path().join("mosaic.json");
    mosaic.write_json(&path, true).unwrap();

    std::fs::remove_dir_all(fixture.path().join("sources")).unwrap();
    std::fs::remove_file(fixture.path().join("target.wav")).unwrap();

    let restored = Mosaic::read_json(&path).unwrap();
    assert_eq!(restored.frames(), mosaic.frames());
    let original = mosaic.to_audio(&params(), &EmbeddedOnly).unwrap();
    let rendered = restored.to_audio(&params(), &EmbeddedOnly).unwrap();
    assert_eq!(buffer_hash(&rendered), buffer_hash(&original));
}

#[test]
fn test_non_portable_mosaic_loads_sources_when_rendering() {
    let fixture = AudioFixture::new();
    let (_, mosaic) = build(&fixture);
    let path = fixture.path().join("mosaic.json");
    mosaic.write_json(&path, false).unwrap();

    let restored = Mosaic::read_json(&path).unwrap();
    assert_eq!(restored.frames(), mosaic.frames());

    let err = restored.to_audio(&params(), &EmbeddedOnly).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceMissing);

    let original = mosaic.to_audio(&params(), &EmbeddedOnly).unwrap();
    let loaded = restored.to_audio(&params(), &WavLoader).unwrap();
    assert_eq!(buffer_hash(&loaded), buffer_hash(&original));
}

#[test]
fn test_missing_target_reported_only_when_it_can_play() {
    let fixture = AudioFixture::new();
    let (_, mosaic) = build(&fixture);
    let path = fixture.path().join("mosaic.json");
    mosaic.write_json(&path, false).unwrap();
    std::fs::remove_file(fixture.path().join("target.wav")).unwrap();

    // reading still succeeds
    let restored = Mosaic::read_json(&path).unwrap();

    // with every segment on the corpus the target is never opened
    let corpus_only = restored.to_audio(&params(), &WavLoader).unwrap();
    assert_eq!(
        buffer_hash(&corpus_only),
        buffer_hash(&mosaic.to_audio(&params(), &EmbeddedOnly).unwrap())
    );

    let mixed = SynthesisParams {
        corpus_weights: CorpusWeights::Mix(0.5.into()),
        ..params()
    };
    let err = restored.to_audio(&mixed, &WavLoader).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceMissing);
}

#[test]
fn test_portable_mosaic_from_non_portable_corpus() {
    let fixture = AudioFixture::new();
    let (corpus, mosaic) = build(&fixture);
    let corpus_path = fixture.path().join("corpus.json");
    let mosaic_path = fixture.path().join("mosaic.json");
    corpus.write_json(&corpus_path, false).unwrap();

    let restored = Corpus::read_json(&corpus_path).unwrap();
    let rebuilt =
        Mosaic::analyze(fixture.target(), &[restored], &SpectralAnalyzer::new()).unwrap();
    let err = rebuilt.write_json(&mosaic_path, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(!mosaic_path.exists());

    rebuilt
        .embedded(&WavLoader)
        .unwrap()
        .write_json(&mosaic_path, true)
        .unwrap();
    std::fs::remove_dir_all(fixture.path().join("sources")).unwrap();
    std::fs::remove_file(fixture.path().join("target.wav")).unwrap();

    let portable = Mosaic::read_json(&mosaic_path).unwrap();
    assert_eq!(portable.summarize().get("audio"), Some("embedded"));
    let rendered = portable.to_audio(&params(), &EmbeddedOnly).unwrap();
    let original = mosaic.to_audio(&params(), &EmbeddedOnly).unwrap();
    assert_eq!(buffer_hash(&rendered), buffer_hash(&original));
}

#[test]
fn test_wrong_kind_is_invalid_input() {
    let fixture = AudioFixture::new();
    let (corpus, mosaic) = build(&fixture);

    let corpus_json = corpus.to_json(false).unwrap();
    let err = Mosaic::from_json(&corpus_json).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let mosaic_json = mosaic.to_json(false).unwrap();
    let err = Corpus::from_json(&mosaic_json).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let header = SnapshotHeader::peek(&mosaic_json).unwrap();
    assert_eq!(header.kind.as_deref(), Some("mosaic"));
}

#[test]
fn test_unsupported_version_is_invalid_input() {
    let fixture = AudioFixture::new();
    let (corpus, _) = build(&fixture);
    let mut value: serde_json::Value =
        serde_json::from_str(&corpus.to_json(false).unwrap()).unwrap();
    value["version"] = serde_json::json!(99);

    let err = Corpus::from_json(&value.to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

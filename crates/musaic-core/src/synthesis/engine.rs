//! Grain selection and overlap-add rendering.

use std::collections::HashMap;

use rand::distributions::{Distribution, Open01, WeightedIndex};
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::audio::{normalize_peak, resample_to_rate, AudioBuffer, AudioLoader, HEADROOM_GAIN};
use crate::control::linspace;
use crate::error::CoreResult;
use crate::mosaic::{Candidate, CorpusId, GrainRef, Mosaic};
use crate::rng::{create_component_rng, create_segment_rng, resolve_seed};

use super::params::SynthesisParams;
use super::tables::{
    corpus_weight_table, onset_table, pan_table, win_length_table, ControlTables, WindowBank,
};

/// Number of segments rendered into one partial buffer.
const BLOCK_SEGMENTS: usize = 64;

/// What happened to one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrainStatus {
    /// The grain was added to the output.
    Rendered,
    /// The grain did not fit inside its source and was skipped.
    OutOfBounds,
    /// The segment had no candidate to choose from.
    NoCandidates,
}

/// Selection and placement of one segment's grain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainReport {
    /// Segment index.
    pub segment: usize,
    /// Chosen grain, if any.
    pub grain: Option<GrainRef>,
    /// Amplitude the grain was scaled by.
    pub amp: f64,
    /// Output onset in frames.
    pub onset: usize,
    /// Grain length in frames after quantization (0 when skipped).
    pub len: usize,
    /// Outcome.
    pub status: GrainStatus,
}

impl GrainReport {
    /// Returns true if the grain came from the target.
    pub fn is_passthrough(&self) -> bool {
        matches!(
            self.grain,
            Some(GrainRef {
                corpus_id: CorpusId::Target,
                ..
            })
        )
    }
}

/// Result of a render.
#[derive(Debug, Clone)]
pub struct Render {
    /// Output audio.
    pub buffer: AudioBuffer,
    /// One report per segment.
    pub grains: Vec<GrainReport>,
    /// Seed the render used.
    pub seed: u32,
}

impl Render {
    /// Number of grains that reached the output.
    pub fn rendered(&self) -> usize {
        self.grains
            .iter()
            .filter(|g| g.status == GrainStatus::Rendered)
            .count()
    }

    /// Number of segments that played the target.
    pub fn passthrough(&self) -> usize {
        self.grains.iter().filter(|g| g.is_passthrough()).count()
    }
}

/// Resampled sources by owner and source id.
type SourceMap = HashMap<(CorpusId, usize), Prepared>;

/// Source audio resampled to the render rate.
struct Prepared {
    samples: Vec<f32>,
    native_rate: u32,
}

/// Renders a [`Mosaic`] with fixed parameters.
#[derive(Debug)]
pub struct SynthesisEngine<'a> {
    mosaic: &'a Mosaic,
    params: SynthesisParams,
    sample_rate: u32,
    seed: u32,
}

impl<'a> SynthesisEngine<'a> {
    /// Validates `params` against `mosaic`.
    ///
    /// # Errors
    /// Returns `Configuration` for unusable static parameters, malformed
    /// controls, or per-source weights of the wrong length.
    pub fn new(mosaic: &'a Mosaic, params: &SynthesisParams) -> CoreResult<Self> {
        params.validate(mosaic.num_corpora())?;
        Ok(Self {
            mosaic,
            params: params.clone(),
            sample_rate: params.render_rate(mosaic.target_sample_rate()),
            seed: resolve_seed(params.seed),
        })
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seed used for every random decision.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Hop between target frames at the output rate.
    pub fn hop_length(&self) -> usize {
        (self.mosaic.hop_length() as f64 * self.sample_rate as f64
            / self.mosaic.target_sample_rate() as f64) as usize
    }

    /// Resolves every control into per-segment tables.
    pub fn tables(&self) -> CoreResult<ControlTables> {
        let n = self.mosaic.num_frames();
        let params = &self.params;
        let res = params.win_length_res;

        let weights = corpus_weight_table(&params.corpus_weights, n, self.mosaic.num_corpora())?;
        let win_lengths = win_length_table(&params.grain_dur, n, self.sample_rate, res)?;
        let onsets = onset_table(
            &params.stretch_factor,
            &params.onset_var,
            n,
            self.hop_length(),
            self.sample_rate,
            &mut create_component_rng(self.seed, "onset"),
        )?;
        let pans = pan_table(
            &params.pan_depth,
            n,
            params.n_chans,
            &mut create_component_rng(self.seed, "pan"),
        )?;
        let fidelity = params.fidelity.resolve_clamped(n, 0.0, 1.0)?;

        Ok(ControlTables {
            weights,
            win_lengths,
            onsets,
            pans,
            fidelity,
        })
    }

    /// Picks, windows and mixes one grain per target segment.
    ///
    /// Deferred sources are loaded through `loader` first; a missing file
    /// fails the render with `ResourceMissing`. The target is only loaded
    /// when some segment can play it. Grains that do not fit inside their
    /// source are skipped and reported as [`GrainStatus::OutOfBounds`].
    /// The output is normalized to a peak of `sqrt(0.5)` unless it is silent.
    pub fn render(&self, loader: &dyn AudioLoader) -> CoreResult<Render> {
        let n = self.mosaic.num_frames();
        let channels = self.params.n_chans;
        if n == 0 {
            return Ok(Render {
                buffer: AudioBuffer::empty(channels, self.sample_rate),
                grains: Vec::new(),
                seed: self.seed,
            });
        }

        info!(
            segments = n,
            channels,
            sample_rate = self.sample_rate,
            seed = self.seed,
            "rendering mosaic"
        );
        let tables = self.tables()?;
        let sources = self.prepare(&tables, loader)?;
        let placements: Vec<Placement> = (0..n)
            .into_par_iter()
            .map(|n| self.plan(n, &tables, &sources))
            .collect();
        let windows = WindowBank::new(
            &self.params.grain_env,
            placements.iter().filter_map(|p| p.span.map(|span| span.len)),
        )?;
        let out_len = tables.output_len();

        let partials: Vec<Partial> = placements
            .par_chunks(BLOCK_SEGMENTS)
            .map(|block| self.render_block(block, &tables, &windows, &sources, out_len))
            .collect();

        let mut samples = vec![0.0f32; out_len * channels];
        for partial in partials {
            let start = partial.offset * channels;
            for (out, value) in samples[start..].iter_mut().zip(&partial.samples) {
                *out += value;
            }
        }
        normalize_peak(&mut samples, HEADROOM_GAIN);

        let buffer = AudioBuffer::from_interleaved(samples, channels, self.sample_rate)?;
        let render = Render {
            buffer,
            grains: placements.into_iter().map(|p| p.report).collect(),
            seed: self.seed,
        };
        info!(
            rendered = render.rendered(),
            passthrough = render.passthrough(),
            frames = render.buffer.num_frames(),
            "rendered mosaic"
        );
        Ok(render)
    }

    /// Loads and resamples the sources a render can reach.
    fn prepare(&self, tables: &ControlTables, loader: &dyn AudioLoader) -> CoreResult<SourceMap> {
        let uses_target = tables.weights.uses_target();
        let files: Vec<_> = self
            .mosaic
            .banks()
            .iter()
            .filter(|bank| uses_target || bank.corpus_id != CorpusId::Target)
            .flat_map(|bank| bank.files.iter().map(move |(&id, file)| (bank, id, file)))
            .collect();
        let sample_rate = self.sample_rate;
        files
            .into_par_iter()
            .map(|(bank, source_id, file)| {
                let native = file.resolve(&bank.source_root, bank.max_duration, loader)?;
                let samples = resample_to_rate(&native, file.sample_rate, sample_rate);
                Ok((
                    (bank.corpus_id, source_id),
                    Prepared {
                        samples,
                        native_rate: file.sample_rate,
                    },
                ))
            })
            .collect()
    }

    /// Selects the grain of segment `n` and fits it into its source.
    fn plan(&self, n: usize, tables: &ControlTables, sources: &SourceMap) -> Placement {
        let mut report = self.select(n, tables);
        let Some(grain) = report.grain else {
            return Placement { report, span: None };
        };
        let span = sources
            .get(&(grain.corpus_id, grain.source_id))
            .and_then(|source| {
                grain_size(
                    grain.marker,
                    source,
                    self.sample_rate,
                    tables.win_lengths[n],
                    self.params.win_length_res,
                )
            });
        match span {
            Some(span) => {
                report.len = span.len;
                report.status = GrainStatus::Rendered;
            }
            None => {
                debug!(
                    segment = n,
                    corpus = %grain.corpus_id,
                    source = grain.source_id,
                    marker = grain.marker,
                    "grain out of bounds"
                );
                report.status = GrainStatus::OutOfBounds;
            }
        }
        Placement { report, span }
    }

    fn render_block(
        &self,
        block: &[Placement],
        tables: &ControlTables,
        windows: &WindowBank,
        sources: &SourceMap,
        out_len: usize,
    ) -> Partial {
        let channels = self.params.n_chans;
        let segments = || block.iter().map(|p| p.report.segment);
        let offset = segments().map(|n| tables.onsets[n]).min().unwrap_or(0);
        let end = segments()
            .map(|n| tables.onsets[n] + tables.win_lengths[n])
            .max()
            .unwrap_or(offset)
            .min(out_len);
        let mut samples = vec![0.0f32; end.saturating_sub(offset) * channels];

        for placement in block {
            self.place(placement, tables, windows, sources, &mut samples, offset);
        }
        Partial { offset, samples }
    }

    /// Chooses the grain of segment `n`.
    fn select(&self, n: usize, tables: &ControlTables) -> GrainReport {
        let mut rng = create_segment_rng(self.seed, n as u64);
        let row = &tables.weights.rows[n];
        let target_weight = row[0];
        let mut report = GrainReport {
            segment: n,
            grain: None,
            amp: 0.0,
            onset: tables.onsets[n],
            len: 0,
            status: GrainStatus::NoCandidates,
        };

        let r: f64 = rng.sample(Open01);
        if r > target_weight {
            let frame = &self.mosaic.frames()[n];
            let pool: Vec<&Candidate> = if tables.weights.per_source {
                let Some(corpus) = WeightedIndex::new(&row[1..])
                    .ok()
                    .map(|dist| dist.sample(&mut rng))
                else {
                    return report;
                };
                frame
                    .iter()
                    .filter(|c| c.grain.corpus_id == CorpusId::Corpus(corpus))
                    .collect()
            } else {
                frame.iter().collect()
            };
            if let Some(candidate) = choose(&pool, tables.fidelity[n], &mut rng) {
                report.grain = Some(candidate.grain);
                report.amp = 1.0;
            }
        } else {
            let marker = (n * self.mosaic.hop_length()) as u64;
            report.grain = Some(GrainRef::passthrough(marker));
            report.amp = target_weight;
        }
        report
    }

    /// Mixes a placed grain into a block buffer.
    fn place(
        &self,
        placement: &Placement,
        tables: &ControlTables,
        windows: &WindowBank,
        sources: &SourceMap,
        block: &mut [f32],
        offset: usize,
    ) {
        let (Some(grain), Some(span)) = (placement.report.grain, placement.span) else {
            return;
        };
        let Some(source) = sources.get(&(grain.corpus_id, grain.source_id)) else {
            return;
        };
        let Some(window) = windows.get(span.len) else {
            return;
        };

        let n = placement.report.segment;
        let channels = self.params.n_chans;
        let pan = &tables.pans[n];
        let amp = placement.report.amp as f32;
        let grain_samples = &source.samples[span.start..span.start + span.len];
        let first = (tables.onsets[n] - offset) * channels;
        for (i, (sample, w)) in grain_samples.iter().zip(window).enumerate() {
            let value = sample * w * amp;
            let frame = first + i * channels;
            for (ch, gain) in pan.iter().enumerate() {
                block[frame + ch] += value * gain;
            }
        }
    }
}

/// Weighted pick among the best candidates of a pool.
///
/// The pool is cut to `max(1, floor(len * (1 - fidelity)))` candidates and
/// weighted linearly from 1 (best) down to 0.
fn choose<'c, R: Rng>(
    pool: &[&'c Candidate],
    fidelity: f64,
    rng: &mut R,
) -> Option<&'c Candidate> {
    if pool.is_empty() {
        return None;
    }
    let num = ((pool.len() as f64 * (1.0 - fidelity)).floor() as usize).clamp(1, pool.len());
    if num == 1 {
        return Some(pool[0]);
    }
    let index = WeightedIndex::new(linspace(1.0, 0.0, num))
        .map(|dist| dist.sample(rng))
        .unwrap_or(0);
    Some(pool[index])
}

/// Position of a grain inside its resampled source.
#[derive(Debug, Clone, Copy)]
struct GrainSpan {
    start: usize,
    len: usize,
}

/// Computes the quantized span of a grain, or `None` if it does not fit.
fn grain_size(
    marker: u64,
    source: &Prepared,
    sample_rate: u32,
    win_length: usize,
    res: usize,
) -> Option<GrainSpan> {
    let last = source.samples.len().checked_sub(1)?;
    let start = (marker as f64 * sample_rate as f64 / source.native_rate as f64) as usize;
    let end = last.min(start.saturating_add(win_length));
    let len = end.checked_sub(start)? / res * res;
    if len == 0 || start + len > last {
        return None;
    }
    Some(GrainSpan { start, len })
}

/// A segment's selection and, if it fits, its span in the source.
struct Placement {
    report: GrainReport,
    span: Option<GrainSpan>,
}

/// Rendered output of one block of segments.
struct Partial {
    offset: usize,
    samples: Vec<f32>,
}

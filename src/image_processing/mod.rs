pub mod batch;
pub mod buffer;
pub mod codec;
pub mod convert;
pub mod dithering;
pub mod effects;
pub mod error;
pub mod generation;
pub mod glitch;
pub mod optimization_report;
pub mod options;
pub mod ordered;
pub mod palette;
pub mod pipeline;
pub mod resize;
pub mod sequence_optimizer;
pub mod tone;

pub use buffer::{AnimatedSequence, Frame, PixelBuffer};
pub use error::ProcessingError;
pub use generation::{GenerationTracker, Generational};
pub use options::{
    BayerSize, DitherMethod, DitheringOptions, Effect, OptimizationOptions, ProcessingOptions,
    ToneSettings,
};
pub use palette::Palette;
pub use pipeline::process_frame;
pub use resize::scale;
pub use sequence_optimizer::OptimizationStats;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::utils::{
    has_valid_extension, output_filename_for_stem, output_stem, unique_output_stems,
    verbose_println,
};
use batch::BatchProcessor;
use pipeline::process_frame_with_rng;
use sequence_optimizer::optimize_sequence;

#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// Worker threads; 0 means one per logical CPU.
    pub parallel_jobs: usize,
    pub verbose: bool,
    /// Base seed; frame `i` of a sequence uses `seed + i`.
    pub seed: Option<u64>,
    pub extensions: Vec<String>,
    /// Extension for still-image outputs (animations are always GIF).
    pub output_extension: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_jobs: 0,
            verbose: false,
            seed: None,
            extensions: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
            ],
            output_extension: "png".to_string(),
        }
    }
}

/// Drives the pixel pipeline over frames, sequences and files on a private
/// thread pool.
pub struct ProcessingEngine {
    config: ProcessingConfig,
    pool: rayon::ThreadPool,
}

impl ProcessingEngine {
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        let threads = if config.parallel_jobs == 0 {
            num_cpus::get()
        } else {
            config.parallel_jobs
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("ditherfx-worker-{}", index))
            .build()
            .context("Failed to initialize thread pool")?;

        verbose_println(
            config.verbose,
            &format!("Thread pool ready with {} workers", threads),
        );

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Generator for frame `index`: seeded from the config when set, fresh
    /// entropy otherwise.
    fn frame_rng(&self, index: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Discover all image files in the given files and directories
    pub fn discover_images(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut image_files = Vec::new();

        for input in inputs {
            if input.is_file() {
                if has_valid_extension(input, &self.config.extensions) {
                    image_files.push(input.clone());
                } else {
                    verbose_println(
                        self.config.verbose,
                        &format!("Skipping unsupported file: {}", input.display()),
                    );
                }
                continue;
            }

            verbose_println(
                self.config.verbose,
                &format!("Scanning directory: {}", input.display()),
            );

            let walker = WalkDir::new(input).follow_links(false).max_depth(10);

            for entry in walker {
                let entry = entry.context("Failed to read directory entry")?;
                let path = entry.path();

                if path.is_file() && has_valid_extension(path, &self.config.extensions) {
                    image_files.push(path.to_path_buf());
                }
            }
        }

        // Sort for consistent processing order
        image_files.sort();
        image_files.dedup();

        verbose_println(
            self.config.verbose,
            &format!("Found {} image files", image_files.len()),
        );
        Ok(image_files)
    }

    fn log_fallbacks(&self, options: &ProcessingOptions) {
        if self.config.verbose {
            for note in options.fallback_notes() {
                verbose_println(true, &note);
            }
        }
    }

    /// Run the pipeline on a single buffer.
    pub fn process_frame(&self, buffer: PixelBuffer, options: &ProcessingOptions) -> PixelBuffer {
        let start = Instant::now();
        self.log_fallbacks(options);
        let (width, height) = buffer.dimensions();
        let mut rng = self.frame_rng(0);
        let output = process_frame_with_rng(buffer, options, &mut rng);

        verbose_println(
            self.config.verbose,
            &format!(
                "Processed {}x{} frame -> {}x{} in {:?}",
                width,
                height,
                output.width(),
                output.height(),
                start.elapsed()
            ),
        );
        output
    }

    /// Process every frame in parallel, then optionally optimize the result.
    ///
    /// `progress` receives the completed fraction after each frame, from
    /// whichever worker finished it.
    pub fn process_sequence(
        &self,
        sequence: AnimatedSequence,
        options: &ProcessingOptions,
        optimize: Option<&OptimizationOptions>,
        progress: Option<&(dyn Fn(f64) + Sync)>,
    ) -> error::Result<AnimatedSequence> {
        self.process_sequence_with_stats(sequence, options, optimize, progress)
            .map(|(sequence, _)| sequence)
    }

    /// [`process_sequence`](Self::process_sequence) that also returns what the
    /// optimizer did.
    pub fn process_sequence_with_stats(
        &self,
        sequence: AnimatedSequence,
        options: &ProcessingOptions,
        optimize: Option<&OptimizationOptions>,
        progress: Option<&(dyn Fn(f64) + Sync)>,
    ) -> error::Result<(AnimatedSequence, Option<OptimizationStats>)> {
        let start = Instant::now();
        let loop_count = sequence.loop_count();
        let frames = sequence.into_frames();
        let tracker = BatchProcessor::new(frames.len());

        verbose_println(
            self.config.verbose,
            &format!("Processing {} frames", frames.len()),
        );
        self.log_fallbacks(options);

        let processed: Vec<Frame> = self.pool.install(|| {
            frames
                .into_par_iter()
                .enumerate()
                .map(|(index, frame)| {
                    let mut rng = self.frame_rng(index);
                    let buffer = process_frame_with_rng(frame.buffer, options, &mut rng);

                    let completed = tracker.increment();
                    if let Some(callback) = progress {
                        callback(tracker.fraction_of(completed));
                    }

                    Frame {
                        buffer,
                        delay_ms: frame.delay_ms,
                        disposal: frame.disposal,
                    }
                })
                .collect()
        });

        let processed = AnimatedSequence::new(processed, loop_count)?;
        verbose_println(
            self.config.verbose,
            &format!(
                "Frames done in {:?} ({:.1} frames/s)",
                start.elapsed(),
                tracker.items_per_second()
            ),
        );

        match optimize {
            Some(optimization) => {
                let (optimized, stats) = optimize_sequence(processed, optimization)?;
                verbose_println(
                    self.config.verbose,
                    &format!(
                        "Optimized {} -> {} frames ({} duplicates, {} merged, {} trailing dropped)",
                        stats.input_frames,
                        stats.output_frames,
                        stats.duplicates_removed,
                        stats.frames_merged,
                        stats.trailing_frames_dropped
                    ),
                );
                Ok((optimized, Some(stats)))
            }
            None => Ok((processed, None)),
        }
    }

    /// Process a frame for a request tagged with `generation`.
    ///
    /// The caller decides whether to publish the result with
    /// [`GenerationTracker::accept`].
    pub fn process_frame_tagged(
        &self,
        generation: u64,
        buffer: PixelBuffer,
        options: &ProcessingOptions,
    ) -> Generational<PixelBuffer> {
        Generational::new(generation, self.process_frame(buffer, options))
    }

    pub fn process_sequence_tagged(
        &self,
        generation: u64,
        sequence: AnimatedSequence,
        options: &ProcessingOptions,
        optimize: Option<&OptimizationOptions>,
        progress: Option<&(dyn Fn(f64) + Sync)>,
    ) -> Generational<error::Result<AnimatedSequence>> {
        Generational::new(
            generation,
            self.process_sequence(sequence, options, optimize, progress),
        )
    }

    /// Where [`process_file_as`](Self::process_file_as) writes `input_path`.
    ///
    /// Multi-frame GIFs keep the `gif` extension; everything else, single-frame
    /// GIFs included, uses the configured still format.
    pub fn output_path_for(
        &self,
        input_path: &Path,
        output_stem: &str,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let animated = codec::is_gif(input_path) && codec::gif_frame_count(input_path)? > 1;
        let extension = if animated {
            "gif"
        } else {
            self.config.output_extension.as_str()
        };
        Ok(output_dir.join(output_filename_for_stem(output_stem, extension)))
    }

    /// Load, process and save one input file as `<stem>_dithered.<ext>`.
    ///
    /// Multi-frame GIFs go through the sequence path and are written as GIF;
    /// everything else is processed as a still image.
    pub fn process_file(
        &self,
        input_path: &Path,
        output_dir: &Path,
        options: &ProcessingOptions,
        optimize: Option<&OptimizationOptions>,
        frame_progress: Option<&(dyn Fn(f64) + Sync)>,
    ) -> Result<ProcessingResult> {
        self.process_file_as(
            input_path,
            &output_stem(input_path),
            output_dir,
            options,
            optimize,
            frame_progress,
        )
    }

    /// [`process_file`](Self::process_file) with an explicit output stem.
    pub fn process_file_as(
        &self,
        input_path: &Path,
        output_stem: &str,
        output_dir: &Path,
        options: &ProcessingOptions,
        optimize: Option<&OptimizationOptions>,
        frame_progress: Option<&(dyn Fn(f64) + Sync)>,
    ) -> Result<ProcessingResult> {
        let start = Instant::now();
        verbose_println(
            self.config.verbose,
            &format!("Processing: {}", input_path.display()),
        );

        if codec::is_gif(input_path) {
            let sequence = codec::load_gif(input_path)?;
            if sequence.len() > 1 {
                let frames_in = sequence.len();
                let (output, stats) = self
                    .process_sequence_with_stats(sequence, options, optimize, frame_progress)
                    .with_context(|| format!("Failed to process {}", input_path.display()))?;

                let output_path = output_dir.join(output_filename_for_stem(output_stem, "gif"));
                codec::save_gif(&output, &output_path)?;

                return Ok(ProcessingResult {
                    input_path: input_path.to_path_buf(),
                    output_path,
                    kind: OutputKind::Animation {
                        frames_in,
                        frames_out: output.len(),
                    },
                    optimization: stats,
                    processing_time: start.elapsed(),
                });
            }

            verbose_println(
                self.config.verbose,
                &format!("{} has a single frame, treating as still", input_path.display()),
            );
        }

        let buffer = codec::load_image(input_path)?;
        let output = self.process_frame(buffer, options);

        let output_path = output_dir.join(output_filename_for_stem(
            output_stem,
            &self.config.output_extension,
        ));
        codec::save_image(&output, &output_path)?;

        if let Some(callback) = frame_progress {
            callback(1.0);
        }

        Ok(ProcessingResult {
            input_path: input_path.to_path_buf(),
            output_path,
            kind: OutputKind::Still,
            optimization: None,
            processing_time: start.elapsed(),
        })
    }

    /// Process a batch of files in parallel with a completion callback.
    ///
    /// Output names come from [`unique_output_stems`], so two inputs never
    /// write the same file. `frame_progress` receives the fraction of frames done for each
    /// animation as it is processed.
    pub fn process_batch<F>(
        &self,
        image_files: &[PathBuf],
        output_dir: &Path,
        options: &ProcessingOptions,
        optimize: Option<&OptimizationOptions>,
        frame_progress: Option<&(dyn Fn(&Path, f64) + Sync)>,
        progress_callback: F,
    ) -> Vec<Result<ProcessingResult>>
    where
        F: Fn(&Path, usize, &Result<ProcessingResult>) + Send + Sync,
    {
        let tracker = BatchProcessor::new(image_files.len());
        let stems = unique_output_stems(image_files);
        for (path, stem) in image_files.iter().zip(&stems) {
            if *stem != output_stem(path) {
                verbose_println(
                    self.config.verbose,
                    &format!("Output name for {} renamed to {}", path.display(), stem),
                );
            }
        }

        self.pool.install(|| {
            image_files
                .par_iter()
                .zip(stems.par_iter())
                .map(|(image_path, stem)| {
                    let per_file =
                        frame_progress.map(|report| move |fraction: f64| report(image_path.as_path(), fraction));
                    let result = self.process_file_as(
                        image_path,
                        stem,
                        output_dir,
                        options,
                        optimize,
                        per_file.as_ref().map(|f| f as &(dyn Fn(f64) + Sync)),
                    );

                    let count = tracker.increment();
                    progress_callback(image_path, count, &result);

                    result
                })
                .collect()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    Still,
    Animation { frames_in: usize, frames_out: usize },
}

#[derive(Debug)]
pub struct ProcessingResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub kind: OutputKind,
    pub optimization: Option<OptimizationStats>,
    pub processing_time: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn engine(seed: Option<u64>) -> ProcessingEngine {
        ProcessingEngine::new(ProcessingConfig {
            parallel_jobs: 2,
            seed,
            ..Default::default()
        })
        .unwrap()
    }

    fn sequence(colors: &[[u8; 4]], delay_ms: u32) -> AnimatedSequence {
        let frames = colors
            .iter()
            .map(|&c| Frame::new(PixelBuffer::filled(6, 6, c).unwrap(), delay_ms))
            .collect();
        AnimatedSequence::new(frames, 0).unwrap()
    }

    fn glitchy_options() -> ProcessingOptions {
        ProcessingOptions {
            effects: vec![Effect::Glitch {
                intensity: 0.9,
                block_size: 2,
            }],
            dithering: Some(DitheringOptions::new(
                DitherMethod::Jitter,
                Palette::default(),
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_process_sequence_preserves_order_and_delays() {
        let input = sequence(
            &[[0, 0, 0, 255], [255, 255, 255, 255], [0, 0, 0, 255]],
            40,
        );
        let options = ProcessingOptions {
            effects: vec![Effect::Invert],
            ..Default::default()
        };
        let output = engine(None)
            .process_sequence(input, &options, None, None)
            .unwrap();

        assert_eq!(output.len(), 3);
        let firsts: Vec<[u8; 4]> = output
            .frames()
            .iter()
            .map(|f| f.buffer.read_pixel(0, 0))
            .collect();
        assert_eq!(
            firsts,
            vec![[255, 255, 255, 255], [0, 0, 0, 255], [255, 255, 255, 255]]
        );
        assert!(output.frames().iter().all(|f| f.delay_ms == 40));
    }

    #[test]
    fn test_seeded_sequence_is_reproducible_across_runs() {
        let colors = [[90, 120, 200, 255]; 6];
        let options = glitchy_options();

        let a = engine(Some(7))
            .process_sequence(sequence(&colors, 10), &options, None, None)
            .unwrap();
        let b = engine(Some(7))
            .process_sequence(sequence(&colors, 10), &options, None, None)
            .unwrap();
        assert_eq!(a, b);

        // Frame i is seeded with seed + i, independently of scheduling.
        let single = engine(Some(9)).process_frame(
            PixelBuffer::filled(6, 6, [90, 120, 200, 255]).unwrap(),
            &options,
        );
        assert_eq!(a.frames()[2].buffer, single);
    }

    #[test]
    fn test_progress_reaches_one() {
        let input = sequence(&[[10, 10, 10, 255]; 5], 20);
        let calls = AtomicUsize::new(0);
        let last = Mutex::new(0.0f64);
        let callback = |fraction: f64| {
            calls.fetch_add(1, Ordering::Relaxed);
            let mut max = last.lock().unwrap();
            if fraction > *max {
                *max = fraction;
            }
        };

        engine(None)
            .process_sequence(input, &ProcessingOptions::default(), None, Some(&callback))
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 5);
        assert_eq!(*last.lock().unwrap(), 1.0);
    }

    #[test]
    fn test_process_sequence_runs_optimizer() {
        let a = [200, 0, 0, 255];
        let b = [0, 0, 200, 255];
        let input = sequence(&[a, a, b, b, a], 50);
        let (output, stats) = engine(None)
            .process_sequence_with_stats(
                input,
                &ProcessingOptions::default(),
                Some(&OptimizationOptions::default()),
                None,
            )
            .unwrap();

        let delays: Vec<u32> = output.frames().iter().map(|f| f.delay_ms).collect();
        assert_eq!(delays, vec![100, 100, 50]);
        let stats = stats.unwrap();
        assert_eq!(stats.duplicates_removed, 2);
        assert_eq!(stats.output_frames, 3);
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let engine = engine(Some(1));
        let tracker = GenerationTracker::new();
        let options = ProcessingOptions::default();

        let first = tracker.issue();
        let second = tracker.issue();
        let newer = engine.process_frame_tagged(
            second,
            PixelBuffer::filled(2, 2, [1, 2, 3, 255]).unwrap(),
            &options,
        );
        let older = engine.process_frame_tagged(
            first,
            PixelBuffer::filled(2, 2, [9, 9, 9, 255]).unwrap(),
            &options,
        );

        assert!(tracker.accept(older).is_none());
        assert_eq!(
            tracker.accept(newer).map(|b| b.read_pixel(0, 0)),
            Some([1, 2, 3, 255])
        );

        let tagged = engine.process_sequence_tagged(
            first,
            sequence(&[[0, 0, 0, 255]], 10),
            &options,
            None,
            None,
        );
        assert_eq!(tagged.generation, first);
        assert!(tracker.accept(tagged).is_none());
    }

    #[test]
    fn test_discover_images_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("a.png"), b"").unwrap();
        std::fs::write(nested.join("b.GIF"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = engine(None)
            .discover_images(&[dir.path().to_path_buf()])
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().unwrap() != "txt"));
    }

    #[test]
    fn test_process_file_still_and_animation() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let still = dir.path().join("still.png");
        codec::save_image(&PixelBuffer::filled(8, 8, [120, 120, 120, 255]).unwrap(), &still).unwrap();
        let anim = dir.path().join("anim.gif");
        codec::save_gif(
            &sequence(&[[0, 0, 0, 255], [255, 255, 255, 255]], 100),
            &anim,
        )
        .unwrap();

        let options = ProcessingOptions {
            dithering: Some(DitheringOptions::default()),
            ..Default::default()
        };
        let engine = engine(Some(3));
        let finished = Mutex::new(Vec::new());
        let results = engine.process_batch(
            &[still.clone(), anim.clone()],
            &out_dir,
            &options,
            Some(&OptimizationOptions::default()),
            Some(&|path: &Path, fraction: f64| {
                if fraction >= 1.0 {
                    finished.lock().unwrap().push(path.to_path_buf());
                }
            }),
            |_, _, _| {},
        );

        let still_result = results[0].as_ref().unwrap();
        assert_eq!(still_result.kind, OutputKind::Still);
        assert!(still_result.output_path.exists());
        let written = codec::load_image(&still_result.output_path).unwrap();
        assert!(written
            .pixels()
            .all(|p| p[..3] == [0, 0, 0] || p[..3] == [255, 255, 255]));

        let anim_result = results[1].as_ref().unwrap();
        assert_eq!(
            anim_result.kind,
            OutputKind::Animation {
                frames_in: 2,
                frames_out: 2
            }
        );
        assert!(anim_result.optimization.is_some());
        assert_eq!(codec::load_gif(&anim_result.output_path).unwrap().len(), 2);

        let mut finished = finished.into_inner().unwrap();
        finished.sort();
        assert_eq!(finished, vec![anim, still]);
    }

    #[test]
    fn test_output_path_for_single_frame_gif_uses_still_format() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.gif");
        codec::save_gif(&sequence(&[[9, 9, 9, 255]], 100), &single).unwrap();
        let anim = dir.path().join("anim.gif");
        codec::save_gif(&sequence(&[[0, 0, 0, 255], [255, 255, 255, 255]], 100), &anim).unwrap();

        let engine = engine(None);
        let out_dir = Path::new("out");
        assert_eq!(
            engine.output_path_for(&single, "single", out_dir).unwrap(),
            out_dir.join("single_dithered.png")
        );
        assert_eq!(
            engine.output_path_for(&anim, "anim", out_dir).unwrap(),
            out_dir.join("anim_dithered.gif")
        );

        let written = engine
            .process_file(&single, dir.path(), &ProcessingOptions::default(), None, None)
            .unwrap();
        assert_eq!(written.kind, OutputKind::Still);
        assert_eq!(
            written.output_path,
            engine.output_path_for(&single, "single", dir.path()).unwrap()
        );
    }

    #[test]
    fn test_batch_inputs_sharing_a_stem_get_distinct_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let png = dir.path().join("a.png");
        let jpg = dir.path().join("a.jpg");
        codec::save_image(&PixelBuffer::filled(4, 4, [0, 0, 0, 255]).unwrap(), &png).unwrap();
        codec::save_image(&PixelBuffer::filled(4, 4, [255, 255, 255, 255]).unwrap(), &jpg).unwrap();

        let results = engine(Some(1)).process_batch(
            &[jpg, png],
            &out_dir,
            &ProcessingOptions::default(),
            None,
            None,
            |_, _, _| {},
        );
        let outputs: Vec<PathBuf> = results
            .into_iter()
            .map(|r| r.unwrap().output_path)
            .collect();
        assert_eq!(
            outputs,
            vec![
                out_dir.join("a_jpg_dithered.png"),
                out_dir.join("a_png_dithered.png")
            ]
        );
        assert!(outputs.iter().all(|p| p.exists()));
    }
}

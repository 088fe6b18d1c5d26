use anyhow::{Context, Result};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use ditherfx::cli::Args;
use ditherfx::image_processing::optimization_report::ProcessingReport;
use ditherfx::image_processing::{
    OutputKind, ProcessingConfig, ProcessingEngine, ProcessingOptions, ProcessingResult,
};
use ditherfx::json_output::JsonMessage;
use ditherfx::utils::{
    clamped_parameter_notes, create_frame_progress_bar, create_progress_bar, error_println,
    format_duration, output_stem, unique_output_stems, validate_inputs, verbose_println,
    warn_println, ProcessingStats,
};

fn main() {
    let args = Args::parse_with_sources();
    let json_mode = args.json_progress;

    if let Err(e) = run(args) {
        if json_mode {
            JsonMessage::FileFailed {
                input_path: String::new(),
                error: format!("{:#}", e),
            }
            .emit();
        } else {
            error_println(&format!("{:#}", e));
        }
        std::process::exit(1);
    }
}

fn run(mut args: Args) -> Result<()> {
    let start_time = Instant::now();
    let json_mode = args.json_progress;

    if !json_mode {
        println!("{}", style("ditherfx - Dithering & Effects Processor").bold().blue());
        println!("{}", style("Retro palettes and glitch art for stills and GIFs").dim());
        println!();
    }

    let config_file = args.load_and_merge_config()?;
    validate_inputs(&args)?;

    let warnings: Vec<String> = args
        .unsupported_selectors()
        .into_iter()
        .chain(clamped_parameter_notes(&args))
        .collect();
    for warning in &warnings {
        if json_mode {
            JsonMessage::warning(warning.as_str());
        } else {
            warn_println(warning);
        }
    }

    let options = args.resolve_processing_options(config_file.as_ref())?;
    let optimization = args.resolve_optimization_options(config_file.as_ref());
    let output_extension = args.parse_output_format().map_err(anyhow::Error::msg)?;
    let verbose = args.verbose && !json_mode;

    let config = ProcessingConfig {
        parallel_jobs: args.jobs,
        verbose,
        seed: args.seed,
        extensions: args.parse_extensions(),
        output_extension,
    };

    if verbose {
        print_configuration(&args, &config, &options);
    }

    let engine = ProcessingEngine::new(config)?;
    let image_files = engine.discover_images(&args.input_paths)?;

    if image_files.is_empty() {
        if json_mode {
            JsonMessage::summary(0, 0, 0, start_time.elapsed().as_secs_f64());
        } else {
            println!("{}", style("No images found with specified extensions").red());
        }
        return Ok(());
    }

    let output_stems = unique_output_stems(&image_files);
    for (path, stem) in image_files.iter().zip(&output_stems) {
        if *stem != output_stem(path) {
            let warning = format!(
                "{} shares its name with another input, writing it as {}_dithered",
                path.display(),
                stem
            );
            if json_mode {
                JsonMessage::warning(warning.as_str());
            } else {
                warn_println(&warning);
            }
        }
    }

    if args.dry_run {
        print_dry_run(&engine, &image_files, &output_stems, &args.output_dir, json_mode);
        return Ok(());
    }

    std::fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let results = if json_mode {
        run_with_json_progress(&engine, &image_files, &args.output_dir, &options, optimization.as_ref())
    } else {
        run_with_progress_bars(&engine, &image_files, &args.output_dir, &options, optimization.as_ref())?
    };

    let stats = collect_stats(&image_files, &results, start_time);

    if json_mode {
        JsonMessage::summary(
            stats.total_files,
            stats.successful,
            stats.failed,
            stats.total_duration.as_secs_f64(),
        );
        return Ok(());
    }

    print_summary(&stats, &image_files, &results, &args.output_dir);

    if args.report {
        let mut report = ProcessingReport::new();
        for (path, result) in image_files.iter().zip(&results) {
            match result {
                Ok(r) => report.add_result(r),
                Err(e) => report.add_failure(path, &format!("{:#}", e)),
            }
        }
        report.print();
    }

    Ok(())
}

fn run_with_json_progress(
    engine: &ProcessingEngine,
    image_files: &[PathBuf],
    output_dir: &Path,
    options: &ProcessingOptions,
    optimization: Option<&ditherfx::OptimizationOptions>,
) -> Vec<Result<ProcessingResult>> {
    let total = image_files.len();
    JsonMessage::progress(0, total, "Starting");

    engine.process_batch(
        image_files,
        output_dir,
        options,
        optimization,
        Some(&|path: &Path, fraction: f64| JsonMessage::frame_progress(path, fraction)),
        |path, count, result| {
            match result {
                Ok(r) => {
                    let frames = match r.kind {
                        OutputKind::Still => (1, 1),
                        OutputKind::Animation {
                            frames_in,
                            frames_out,
                        } => (frames_in, frames_out),
                    };
                    JsonMessage::file_completed(
                        &r.input_path,
                        &r.output_path,
                        frames,
                        r.processing_time.as_millis(),
                    );
                }
                Err(e) => JsonMessage::file_failed(path, format!("{:#}", e)),
            }
            JsonMessage::progress(count, total, path.display().to_string());
        },
    )
}

fn run_with_progress_bars(
    engine: &ProcessingEngine,
    image_files: &[PathBuf],
    output_dir: &Path,
    options: &ProcessingOptions,
    optimization: Option<&ditherfx::OptimizationOptions>,
) -> Result<Vec<Result<ProcessingResult>>> {
    let multi_progress = MultiProgress::new();

    let main_progress = multi_progress.add(create_progress_bar(image_files.len() as u64));
    main_progress.set_message("Processing images");

    let completion_pb = multi_progress.add(ProgressBar::new(100));
    completion_pb.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {percent:>3}% {msg}")?
            .progress_chars("██▌ "),
    );
    completion_pb.set_message("Preparing to process...");

    // One bar per animation while its frames are in flight.
    let frame_bars: Mutex<HashMap<PathBuf, ProgressBar>> = Mutex::new(HashMap::new());
    let on_frames = |path: &Path, fraction: f64| {
        if let Ok(mut bars) = frame_bars.lock() {
            let bar = bars.entry(path.to_path_buf()).or_insert_with(|| {
                let label = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("frames")
                    .to_string();
                multi_progress.add(create_frame_progress_bar(&label))
            });
            bar.set_position((fraction.clamp(0.0, 1.0) * 1000.0) as u64);
            if fraction >= 1.0 {
                bar.finish_and_clear();
                bars.remove(path);
            }
        }
    };

    let total = image_files.len();
    let results = engine.process_batch(
        image_files,
        output_dir,
        options,
        optimization,
        Some(&on_frames),
        |path, count, result| {
            main_progress.inc(1);
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
            if result.is_err() {
                main_progress.set_message(format!("Failed: {}", name));
            } else {
                main_progress.set_message(format!("Done: {}", name));
            }
            completion_pb.set_position((count * 100 / total) as u64);
            completion_pb.set_message(format!("{}/{} files", count, total));
        },
    );

    main_progress.finish_with_message("✓ Processing complete!");
    completion_pb.finish_with_message("✓ All tasks completed");
    println!();

    Ok(results)
}

fn collect_stats(
    image_files: &[PathBuf],
    results: &[Result<ProcessingResult>],
    start_time: Instant,
) -> ProcessingStats {
    let mut stats = ProcessingStats::new(image_files.len());
    for result in results.iter().flatten() {
        stats.successful += 1;
        match result.kind {
            OutputKind::Still => stats.stills += 1,
            OutputKind::Animation {
                frames_in,
                frames_out,
            } => {
                stats.animations += 1;
                stats.frames_in += frames_in;
                stats.frames_out += frames_out;
            }
        }
    }
    stats.failed = results.len() - stats.successful;
    stats.total_duration = start_time.elapsed();
    stats
}

fn print_configuration(args: &Args, config: &ProcessingConfig, options: &ProcessingOptions) {
    println!("{}", style("Configuration:").bold());
    println!(
        "  Parallel jobs: {}",
        if config.parallel_jobs == 0 {
            "auto".to_string()
        } else {
            config.parallel_jobs.to_string()
        }
    );
    println!("  Extensions: {:?}", config.extensions);
    println!("  Still output format: {}", config.output_extension);
    match config.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: random"),
    }
    println!(
        "  Tone: contrast {} / midtones {} / highlights {} / scale {}",
        options.tone.contrast, options.tone.midtones, options.tone.highlights, options.tone.scale
    );
    if options.effects.is_empty() {
        println!("  Effects: none");
    } else {
        let names: Vec<&str> = options.effects.iter().map(|e| e.name()).collect();
        println!("  Effects: {}", names.join(" -> "));
    }
    match &options.dithering {
        Some(d) => println!(
            "  Dithering: {} with {} colors",
            d.method,
            d.palette.len()
        ),
        None => println!("  Dithering: disabled"),
    }
    println!(
        "  Animation optimizer: {}",
        if args.no_optimize { "disabled" } else { "enabled" }
    );
    println!();
}

fn print_dry_run(
    engine: &ProcessingEngine,
    image_files: &[PathBuf],
    output_stems: &[String],
    output_dir: &Path,
    json_mode: bool,
) {
    let destinations: Vec<String> = image_files
        .iter()
        .zip(output_stems)
        .map(|(path, stem)| match engine.output_path_for(path, stem, output_dir) {
            Ok(destination) => destination.display().to_string(),
            Err(e) => format!("unreadable ({:#})", e),
        })
        .collect();

    if json_mode {
        for (i, (path, destination)) in image_files.iter().zip(&destinations).enumerate() {
            JsonMessage::Progress {
                current: i + 1,
                total: image_files.len(),
                message: format!("{} -> {}", path.display(), destination),
            }
            .emit();
        }
        JsonMessage::summary(image_files.len(), 0, 0, 0.0);
        return;
    }

    println!("{}", style("Dry Run - files that would be processed:").bold().cyan());
    for (i, (path, destination)) in image_files.iter().zip(&destinations).enumerate() {
        println!(
            "  {}: {} → {}",
            style(format!("#{}", i + 1)).dim(),
            style(path.display()).bold(),
            style(destination).cyan()
        );
    }
    println!();
    println!("{}", style("💡 Dry Run Mode:").bold().yellow());
    println!("  • No files were created during this simulation");
    println!("  • Remove --dry-run to actually process the images");
    verbose_println(
        engine.config().verbose,
        &format!("{} workers would be used", engine.worker_count()),
    );
}

fn print_summary(
    stats: &ProcessingStats,
    image_files: &[PathBuf],
    results: &[Result<ProcessingResult>],
    output_dir: &Path,
) {
    println!("{}", style("Results Summary:").bold().green());
    println!("  Successfully processed: {}", style(stats.successful).bold().green());
    if stats.failed > 0 {
        println!("  Failed: {}", style(stats.failed).bold().red());
    }
    if stats.stills > 0 {
        println!("  Still images: {}", style(stats.stills).bold().cyan());
    }
    if stats.animations > 0 {
        println!(
            "  Animations: {} ({} frames in, {} frames out)",
            style(stats.animations).bold().magenta(),
            stats.frames_in,
            stats.frames_out
        );
    }

    println!();
    println!("{}", style("Performance:").bold().blue());
    println!(
        "  Total processing time: {}",
        style(format_duration(stats.total_duration)).bold()
    );
    println!(
        "  Average time per image: {}",
        style(format_duration(stats.average_duration())).dim()
    );
    println!("  Success rate: {:.1}%", stats.success_rate());

    println!();
    println!("{}", style("Output files:").bold().green());
    println!("  All files: {}", output_dir.display());

    if stats.failed > 0 {
        println!();
        println!("{}", style("Errors encountered:").bold().red());
        let mut error_count = 0;
        for (path, result) in image_files.iter().zip(results) {
            if let Err(e) = result {
                error_count += 1;
                let filename = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("unknown");
                println!(
                    "  {}: {} - {:#}",
                    style(format!("#{}", error_count)).dim(),
                    style(filename).bold().red(),
                    e
                );
            }
        }
        println!();
        println!("  Check image files and try again with --verbose for more details");
    }
}

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Args;
use crate::image_processing::options::{SCALE_RANGE, TONE_RANGE};

/// Suffix added to every output file stem.
pub const OUTPUT_SUFFIX: &str = "dithered";

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// Progress bar over animation frames, driven by a 0-1000 permille position.
pub fn create_frame_progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(1000);
    let style = ProgressStyle::with_template("  {prefix:.dim} [{bar:25.magenta/blue}] {percent:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("██▌ ");
    pb.set_style(style);
    pb.set_prefix(label.to_string());
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Validate command line arguments
pub fn validate_inputs(args: &Args) -> Result<()> {
    if args.input_paths.is_empty() {
        return Err(anyhow::anyhow!(
            "No input given. Use -i/--input or set input_path in the config file"
        ));
    }

    // Validate input paths (directories or files)
    for input_path in &args.input_paths {
        if !input_path.exists() {
            return Err(anyhow::anyhow!(
                "Input path does not exist: {}",
                input_path.display()
            ));
        }
        if !input_path.is_dir() && !input_path.is_file() {
            return Err(anyhow::anyhow!(
                "Input path is neither a file nor a directory: {}",
                input_path.display()
            ));
        }
    }

    let extensions = args.parse_extensions();
    if extensions.is_empty() {
        return Err(anyhow::anyhow!("No valid extensions specified"));
    }

    args.parse_output_format().map_err(anyhow::Error::msg)?;

    if !args.no_dither {
        args.parse_palette().map_err(anyhow::Error::msg)?;
    }

    // Validate job count
    if args.jobs > 64 {
        return Err(anyhow::anyhow!(
            "Job count too high (max 64), got: {}",
            args.jobs
        ));
    }

    Ok(())
}

/// Notes for values the pipeline will clamp, so the user knows what ran.
pub fn clamped_parameter_notes(args: &Args) -> Vec<String> {
    let mut notes = Vec::new();
    for (name, value) in [
        ("contrast", args.contrast),
        ("midtones", args.midtones),
        ("highlights", args.highlights),
    ] {
        if !(TONE_RANGE.0..=TONE_RANGE.1).contains(&value) {
            notes.push(format!(
                "{} {} is outside {}..{} and will be clamped",
                name, value, TONE_RANGE.0, TONE_RANGE.1
            ));
        }
    }
    if !(SCALE_RANGE.0..=SCALE_RANGE.1).contains(&args.scale) {
        notes.push(format!(
            "scale {} is outside {}..{} and will be clamped",
            args.scale, SCALE_RANGE.0, SCALE_RANGE.1
        ));
    }
    if !(0.0..=1.0).contains(&args.glitch_intensity) {
        notes.push(format!(
            "glitch intensity {} will be clamped to 0..1",
            args.glitch_intensity
        ));
    }
    notes
}

/// Check if a string is a #RRGGBB hex color
pub fn is_valid_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Get file extension in lowercase
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file has one of the specified extensions
pub fn has_valid_extension(path: &Path, extensions: &[String]) -> bool {
    if let Some(ext) = get_file_extension(path) {
        extensions.contains(&ext)
    } else {
        false
    }
}

/// File stem of an input, or `image` when it has none.
pub fn output_stem(input_path: &Path) -> String {
    input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string()
}

/// `<stem>_dithered.<extension>`.
pub fn output_filename_for_stem(stem: &str, extension: &str) -> String {
    format!("{}_{}.{}", stem, OUTPUT_SUFFIX, extension)
}

/// Output stems for a batch, one per input, that never collide.
///
/// Inputs sharing a stem (`a.png`, `a.jpg`) get their source extension
/// folded in (`a_png`, `a_jpg`). Any stem still taken after that, such as
/// the same file name in two directories, gets a `_2`, `_3`... suffix.
/// Stems are compared case-insensitively.
pub fn unique_output_stems(image_files: &[PathBuf]) -> Vec<String> {
    let stems: Vec<String> = image_files.iter().map(|p| output_stem(p)).collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.to_lowercase()).or_default() += 1;
    }

    let mut taken = HashSet::new();
    image_files
        .iter()
        .zip(stems)
        .map(|(path, stem)| {
            let shared = counts.get(&stem.to_lowercase()).copied().unwrap_or(0) > 1;
            let mut candidate = match get_file_extension(path) {
                Some(ext) if shared => format!("{}_{}", stem, ext),
                _ => stem,
            };
            if taken.contains(&candidate.to_lowercase()) {
                let mut n = 2;
                while taken.contains(&format!("{}_{}", candidate, n).to_lowercase()) {
                    n += 1;
                }
                candidate = format!("{}_{}", candidate, n);
            }
            taken.insert(candidate.to_lowercase());
            candidate
        })
        .collect()
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    println!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}

/// Run totals for the final summary
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub stills: usize,
    pub animations: usize,
    pub frames_in: usize,
    pub frames_out: usize,
    pub total_duration: Duration,
}

impl ProcessingStats {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.successful as f64 / self.total_files as f64) * 100.0
        }
    }

    pub fn average_duration(&self) -> Duration {
        if self.successful == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.successful as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[test]
    fn test_is_valid_hex_color() {
        assert!(is_valid_hex_color("#FFFFFF"));
        assert!(is_valid_hex_color("#0f380f"));
        assert!(!is_valid_hex_color("FFFFFF"));
        assert!(!is_valid_hex_color("#FFF"));
        assert!(!is_valid_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_extensions() {
        let exts = vec!["png".to_string(), "gif".to_string()];
        assert!(has_valid_extension(Path::new("a/B.PNG"), &exts));
        assert!(has_valid_extension(Path::new("anim.gif"), &exts));
        assert!(!has_valid_extension(Path::new("photo.jpg"), &exts));
        assert!(!has_valid_extension(Path::new("README"), &exts));
    }

    #[test]
    fn test_output_filename() {
        let stem = output_stem(Path::new("/in/holiday.photo.jpg"));
        assert_eq!(stem, "holiday.photo");
        assert_eq!(output_filename_for_stem(&stem, "png"), "holiday.photo_dithered.png");
        assert_eq!(output_stem(Path::new("/")), "image");
    }

    #[test]
    fn test_unique_output_stems() {
        let files: Vec<PathBuf> = ["in/a.jpg", "in/a.png", "in/b.gif", "in/sub/b.gif", "in/B.png"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(
            unique_output_stems(&files),
            vec!["a_jpg", "a_png", "b_gif", "b_gif_2", "B_png"]
        );

        let distinct = vec![PathBuf::from("x.png"), PathBuf::from("y.png")];
        assert_eq!(unique_output_stems(&distinct), vec!["x", "y"]);
    }

    #[test]
    fn test_validate_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            input_paths: vec![dir.path().to_path_buf()],
            ..Default::default()
        };
        assert!(validate_inputs(&args).is_ok());

        let args = Args {
            input_paths: vec![PathBuf::from("/nope/missing")],
            ..Default::default()
        };
        assert!(validate_inputs(&args).is_err());

        let args = Args {
            input_paths: vec![dir.path().to_path_buf()],
            palette: "#12345".to_string(),
            ..Default::default()
        };
        assert!(validate_inputs(&args).is_err());

        assert!(validate_inputs(&Args::default()).is_err());
    }

    #[test]
    fn test_clamped_parameter_notes() {
        let args = Args {
            contrast: 150.0,
            scale: 0.05,
            ..Default::default()
        };
        assert_eq!(clamped_parameter_notes(&args).len(), 2);
        assert!(clamped_parameter_notes(&Args::default()).is_empty());
    }

    #[test]
    fn test_processing_stats() {
        let mut stats = ProcessingStats::new(4);
        stats.successful = 3;
        stats.total_duration = Duration::from_millis(300);
        assert_eq!(stats.success_rate(), 75.0);
        assert_eq!(stats.average_duration(), Duration::from_millis(100));
    }
}

// Melodygen CLI entry point.
//
// Runs the melody engine over JSON note lists or MIDI files and prints the
// results as JSON (or writes them with --out).
//
// Usage:
//   cargo run -p melodygen_music -- <command> [inputs] [flags]
//
// Commands:
//   vary <seed>             Generate a variation batch, filter it, summarize it
//   interpolate <a> <b>     Morph melody A into melody B
//   validate <melody>       Run the constraint checks
//   analyze <melody>        Intervals, contour, scale degrees, phrases
//   seed                    Write a built-in seed melody
//
// Flags:
//   --config FILE           JSON engine config (flags below override it)
//   --scale NAME  --root NOTE  --seed N  --out FILE
//   vary:         --count N  --types a,b,c  --no-filter  --range LO,HI
//                 --midi-dir DIR
//   interpolate:  --method dtw|contour|feature  --steps N  --midi-dir DIR
//   validate:     --no-key  --no-cadence  --no-range  --range LO,HI
//   seed:         --preset NAME | --octave N --count N
//
// Inputs ending in .mid/.midi are read as MIDI; anything else as a JSON
// array of notes. Logging goes to stderr; set RUST_LOG to change the level
// (default melodygen=info).

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use melodygen_music::analysis::MelodyAnalysis;
use melodygen_music::config::EngineConfig;
use melodygen_music::error::{MelodyError, Result};
use melodygen_music::interpolate::{InterpolationMethod, Interpolator};
use melodygen_music::midi::{read_midi_file, write_midi};
use melodygen_music::note::{Melody, pitch_class_name, pitch_name};
use melodygen_music::scale::ScaleName;
use melodygen_music::seed::{SEED_NAMES, named_seed, scale_run};
use melodygen_music::transform::Transformer;
use melodygen_music::validate::{ValidatedVariation, Validator};
use melodygen_music::variation::{BatchStatistics, Variation, VariationGenerator, batch_statistics};
use melodygen_prng::MelodyRng;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 13] = [
    "--config",
    "--scale",
    "--root",
    "--seed",
    "--out",
    "--count",
    "--types",
    "--range",
    "--midi-dir",
    "--method",
    "--steps",
    "--preset",
    "--octave",
];

fn main() -> ExitCode {
    init_logging();
    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("melodygen=info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(args: &[String]) -> Result<()> {
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let rest = &args[args.len().min(2)..];
    let config = load_config(rest)?;
    let out: Option<PathBuf> = parse_flag(rest, "--out");

    match command {
        "vary" => vary(rest, &config, out.as_deref()),
        "interpolate" => interpolate(rest, &config, out.as_deref()),
        "validate" => validate(rest, &config, out.as_deref()),
        "analyze" => analyze(rest, &config, out.as_deref()),
        "seed" => seed(rest, &config, out.as_deref()),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(MelodyError::Usage(format!(
            "unknown command '{}' (expected vary, interpolate, validate, analyze, or seed)",
            other
        ))),
    }
}

fn print_usage() {
    println!("=== Melodygen ===");
    println!("Usage: melodygen <vary|interpolate|validate|analyze|seed> [inputs] [flags]");
    println!("Built-in seeds: {}", SEED_NAMES.join(", "));
    println!("Scales: {}", ScaleName::ALL.map(ScaleName::as_str).join(", "));
}

/// The config file (if any) with command-line overrides applied.
fn load_config(args: &[String]) -> Result<EngineConfig> {
    let mut config = match parse_flag::<PathBuf>(args, "--config") {
        Some(path) => {
            debug!("loading config from {}", path.display());
            EngineConfig::load(&path)?
        }
        None => EngineConfig::default(),
    };

    if let Some(scale) = parse_flag(args, "--scale") {
        config.scale = scale;
    }
    if let Some(root) = parse_flag(args, "--root") {
        config.root = root;
    }
    if let Some(seed) = parse_flag(args, "--seed") {
        config.seed = Some(seed);
    }
    if let Some(count) = parse_flag(args, "--count") {
        config.count = count;
    }
    if let Some(steps) = parse_flag(args, "--steps") {
        config.steps = steps;
    }
    if let Some(method) = parse_flag(args, "--method") {
        config.method = method;
    }
    if let Some(types) = parse_flag::<String>(args, "--types") {
        config.variation_types = Some(types.split(',').map(|t| t.trim().to_string()).collect());
    }
    if let Some(range) = parse_flag::<String>(args, "--range") {
        config.reference_range = Some(parse_range(&range)?);
    }
    if has_flag(args, "--no-filter") {
        config.apply_constraints = false;
    }
    if has_flag(args, "--no-key") {
        config.check_key = false;
    }
    if has_flag(args, "--no-cadence") {
        config.check_cadence = false;
    }
    if has_flag(args, "--no-range") {
        config.check_range = false;
    }
    Ok(config)
}

fn parse_range(text: &str) -> Result<(i32, i32)> {
    let parsed = text
        .split_once(',')
        .and_then(|(lo, hi)| Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?)));
    match parsed {
        Some((lo, hi)) if lo <= hi => Ok((lo, hi)),
        _ => Err(MelodyError::Usage(format!(
            "--range expects LOW,HIGH MIDI pitches, got '{}'",
            text
        ))),
    }
}

#[derive(Serialize)]
struct SeedInfo {
    note_count: usize,
    scale: ScaleName,
    root: &'static str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Batch {
    Filtered(Vec<ValidatedVariation>),
    Unfiltered(Vec<Variation>),
}

#[derive(Serialize)]
struct VaryOutput {
    variations: Batch,
    statistics: BatchStatistics,
    seed_info: SeedInfo,
}

fn vary(args: &[String], config: &EngineConfig, out: Option<&Path>) -> Result<()> {
    let [seed_path] = positionals::<1>(args, "vary <seed>")?;
    let seed = load_melody(Path::new(seed_path))?;
    let scale = config.scale();
    let mut rng = make_rng(config);

    progress(out, format_args!("Seed: {} notes from {}", seed.len(), seed_path));
    progress(
        out,
        format_args!("Scale: {} {}", pitch_class_name(scale.root_pc), scale.name.as_str()),
    );

    let generator = VariationGenerator::new(scale);
    let allowed = config.allowed_types();
    let variations = generator.generate_batch(&seed, config.count, allowed.as_deref(), &mut rng);
    progress(out, format_args!("Generated {} variations", variations.len()));

    let (batch, statistics) = if config.apply_constraints {
        let kept = Validator::new(scale).filter_valid(&variations, config.reference_range);
        progress(
            out,
            format_args!("{} of {} passed validation", kept.len(), variations.len()),
        );
        let plain: Vec<Variation> = kept.iter().map(|k| k.variation.clone()).collect();
        (Batch::Filtered(kept), batch_statistics(&plain))
    } else {
        let statistics = batch_statistics(&variations);
        (Batch::Unfiltered(variations), statistics)
    };

    if let Some(dir) = parse_flag::<PathBuf>(args, "--midi-dir") {
        std::fs::create_dir_all(&dir)?;
        let exported: Vec<(&str, &Melody)> = match &batch {
            Batch::Filtered(kept) => kept
                .iter()
                .map(|k| (k.variation.id.as_str(), &k.variation.notes))
                .collect(),
            Batch::Unfiltered(all) => all.iter().map(|v| (v.id.as_str(), &v.notes)).collect(),
        };
        for (id, notes) in &exported {
            write_midi(notes, &dir.join(format!("{}.mid", id)))?;
        }
        info!("wrote {} MIDI files to {}", exported.len(), dir.display());
    }

    let output = VaryOutput {
        variations: batch,
        statistics,
        seed_info: SeedInfo {
            note_count: seed.len(),
            scale: scale.name,
            root: pitch_class_name(scale.root_pc),
        },
    };
    emit(&output, out)
}

#[derive(Serialize)]
struct InterpolateOutput {
    method: InterpolationMethod,
    steps: usize,
    total_melodies: usize,
    interpolated_melodies: Vec<Melody>,
}

fn interpolate(args: &[String], config: &EngineConfig, out: Option<&Path>) -> Result<()> {
    let [a_path, b_path] = positionals::<2>(args, "interpolate <a> <b>")?;
    let a = load_melody(Path::new(a_path))?;
    let b = load_melody(Path::new(b_path))?;
    let method = config.interpolation_method()?;

    progress(
        out,
        format_args!(
            "{:?}: {} notes -> {} notes, {} steps",
            method,
            a.len(),
            b.len(),
            config.steps
        ),
    );
    let melodies = Interpolator::new(config.scale()).interpolate(method, &a, &b, config.steps);

    if let Some(dir) = parse_flag::<PathBuf>(args, "--midi-dir") {
        std::fs::create_dir_all(&dir)?;
        for (k, melody) in melodies.iter().enumerate() {
            write_midi(melody, &dir.join(format!("step_{:02}.mid", k)))?;
        }
        info!("wrote {} MIDI files to {}", melodies.len(), dir.display());
    }

    emit(
        &InterpolateOutput {
            method,
            steps: config.steps,
            total_melodies: melodies.len(),
            interpolated_melodies: melodies,
        },
        out,
    )
}

fn validate(args: &[String], config: &EngineConfig, out: Option<&Path>) -> Result<()> {
    let [path] = positionals::<1>(args, "validate <melody>")?;
    let melody = load_melody(Path::new(path))?;
    let report = Validator::new(config.scale()).validate(&melody, &config.validation_options());
    progress(
        out,
        format_args!("{}: {}", path, if report.passed { "passed" } else { "failed" }),
    );
    emit(&report, out)
}

fn analyze(args: &[String], config: &EngineConfig, out: Option<&Path>) -> Result<()> {
    let [path] = positionals::<1>(args, "analyze <melody>")?;
    let melody = load_melody(Path::new(path))?;
    let analysis: MelodyAnalysis = Transformer::new(config.scale()).analyze(&melody);
    if let Some(range) = analysis.range {
        progress(
            out,
            format_args!(
                "Range: {} - {} ({} semitones), {} phrases",
                pitch_name(range.lowest),
                pitch_name(range.highest),
                range.span,
                analysis.phrases.len()
            ),
        );
    }
    emit(&analysis, out)
}

fn seed(args: &[String], config: &EngineConfig, out: Option<&Path>) -> Result<()> {
    let melody = match parse_flag::<String>(args, "--preset") {
        Some(name) => named_seed(&name).ok_or_else(|| {
            MelodyError::Usage(format!(
                "unknown seed '{}' (expected one of: {})",
                name,
                SEED_NAMES.join(", ")
            ))
        })?,
        None => {
            let octave = parse_flag(args, "--octave").unwrap_or(4);
            let count = parse_flag(args, "--count").unwrap_or(8);
            scale_run(&config.scale(), octave, count)
        }
    };

    match out {
        Some(path) if is_midi(path) => {
            write_midi(&melody, path)?;
            println!("Wrote {} notes to {}", melody.len(), path.display());
            Ok(())
        }
        _ => emit(&melody, out),
    }
}

fn make_rng(config: &EngineConfig) -> MelodyRng {
    match config.seed {
        Some(seed) => {
            debug!("seeding from {}", seed);
            MelodyRng::new(seed)
        }
        None => MelodyRng::from_time(),
    }
}

fn is_midi(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
}

/// Read a melody from a MIDI file or a JSON note array.
fn load_melody(path: &Path) -> Result<Melody> {
    if is_midi(path) {
        return read_midi_file(path);
    }
    let data = std::fs::read_to_string(path)?;
    let melody: Melody = serde_json::from_str(&data)?;
    debug!("loaded {} notes from {}", melody.len(), path.display());
    Ok(melody)
}

/// Pretty JSON to `out`, or to stdout.
fn emit<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Progress lines go to stdout only when stdout isn't carrying the JSON.
fn progress(out: Option<&Path>, message: impl Display) {
    if out.is_some() {
        println!("  {}", message);
    }
}

/// The first `N` positional arguments (those that are neither flags nor
/// flag values).
fn positionals<'a, const N: usize>(args: &'a [String], usage: &str) -> Result<[&'a str; N]> {
    let mut found = Vec::with_capacity(N);
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
        } else if arg.starts_with("--") {
            skip_next = VALUE_FLAGS.contains(&arg.as_str());
        } else {
            found.push(arg.as_str());
        }
    }
    found.truncate(N);
    found
        .try_into()
        .map_err(|_| MelodyError::Usage(format!("usage: melodygen {}", usage)))
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

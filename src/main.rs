//! svgcast: record a terminal session and render it as an animated SVG.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use svgcast::asciicast::{parse_cast, Cast, CastWriter};
use svgcast::error::{exit_code, Error};
use svgcast::record::{self, record_session, RecordOptions};
use svgcast::template::Template;
use svgcast::timing::{self, TimingOptions};
use svgcast::{config, replay, svg, templates};

#[derive(Debug, Parser)]
#[command(name = "svgcast")]
#[command(about = "Record terminal sessions and render them as animated SVG")]
#[command(version)]
struct Cli {
    /// Log component phases and intermediate sizes
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Program (with arguments) to run inside the PTY; defaults to $SHELL
    #[arg(short = 'c', long, global = true, value_name = "COMMAND")]
    command: Option<String>,

    /// Target screen size as COLSxROWS
    #[arg(short = 'g', long = "screen-geometry", global = true, value_name = "COLSxROWS")]
    screen_geometry: Option<String>,

    /// Minimum frame duration in milliseconds
    #[arg(
        short = 'm',
        long = "min-frame-duration",
        global = true,
        default_value_t = 1,
        value_name = "MS"
    )]
    min_frame_duration: u64,

    /// Maximum frame duration in milliseconds (unlimited when absent)
    #[arg(short = 'M', long = "max-frame-duration", global = true, value_name = "MS")]
    max_frame_duration: Option<u64>,

    /// Duration of the pause before the animation loops, in milliseconds
    #[arg(
        short = 'D',
        long = "loop-delay",
        global = true,
        default_value_t = 1000,
        value_name = "MS"
    )]
    loop_delay: u64,

    /// Built-in template name or path to a template file
    #[arg(
        short = 't',
        long,
        global = true,
        default_value = templates::DEFAULT_TEMPLATE,
        value_name = "NAME_OR_PATH"
    )]
    template: String,

    /// Emit a directory of still SVG frames instead of one animated file
    #[arg(short = 's', long = "still-frames", global = true)]
    still_frames: bool,

    #[command(subcommand)]
    action: Option<Action>,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Record a terminal session to an asciicast v2 file
    Record {
        /// Output cast path; a temp file when absent
        output: Option<PathBuf>,
    },
    /// Render an asciicast v1/v2 file to SVG
    Render {
        /// Input cast file
        input: PathBuf,
        /// Output SVG path (or directory with --still-frames); a temp
        /// location when absent
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    print!("{}", e);
                    process::exit(exit_code::SUCCESS);
                }
                _ => {
                    eprint!("{}", e);
                    process::exit(exit_code::USAGE);
                }
            }
        }
    };

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("svgcast: {}", err);
            process::exit(err.exit_code());
        }
    }
}

fn run(cli: &Cli) -> Result<i32, Error> {
    validate_durations(cli)?;

    match &cli.action {
        Some(Action::Record { output }) => run_record(cli, output.as_deref()),
        Some(Action::Render { input, output }) => run_render(cli, input, output.as_deref()),
        None => run_record_and_render(cli),
    }
}

fn validate_durations(cli: &Cli) -> Result<(), Error> {
    if cli.min_frame_duration < 1 {
        return Err(Error::Usage(
            "--min-frame-duration must be at least 1".to_string(),
        ));
    }
    if let Some(max) = cli.max_frame_duration {
        if max < cli.min_frame_duration {
            return Err(Error::Usage(format!(
                "--max-frame-duration ({}) must not be below --min-frame-duration ({})",
                max, cli.min_frame_duration
            )));
        }
    }
    Ok(())
}

fn record_options(cli: &Cli) -> Result<RecordOptions, Error> {
    let command = match &cli.command {
        Some(arg) => {
            let command = config::split_command(arg);
            if command.is_empty() {
                return Err(Error::Usage("empty --command".to_string()));
            }
            command
        }
        None => vec![config::default_shell()],
    };

    let (cols, rows) = match &cli.screen_geometry {
        Some(arg) => config::parse_geometry(arg)?,
        None => config::terminal_geometry(),
    };

    Ok(RecordOptions {
        command,
        cols,
        rows,
    })
}

fn run_record(cli: &Cli, output: Option<&Path>) -> Result<i32, Error> {
    let opts = record_options(cli)?;
    let cast_path = match output {
        Some(path) => path.to_path_buf(),
        None => config::temp_output_path(".cast")?,
    };

    let outcome = record_to_path(&opts, &cast_path)?;
    println!("Recording saved to {}", cast_path.display());

    Ok(if outcome.interrupted {
        exit_code::SIGINT
    } else {
        exit_code::SUCCESS
    })
}

fn record_to_path(
    opts: &RecordOptions,
    cast_path: &Path,
) -> Result<record::RecordOutcome, Error> {
    let file = fs::File::create(cast_path).map_err(|e| Error::io(cast_path, e))?;
    let mut writer = CastWriter::new(std::io::BufWriter::new(file));
    record_session(opts, &mut writer)
}

fn run_render(cli: &Cli, input: &Path, output: Option<&Path>) -> Result<i32, Error> {
    let text = fs::read_to_string(input).map_err(|e| Error::io(input, e))?;
    let cast = parse_cast(&text)?;
    log::debug!(
        "parsed cast: {}x{}, {} events",
        cast.header.cols,
        cast.header.rows,
        cast.events.len()
    );

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "termtosvg".to_string());

    render_cast(cli, &cast, output, &stem)?;
    Ok(exit_code::SUCCESS)
}

fn render_cast(cli: &Cli, cast: &Cast, output: Option<&Path>, stem: &str) -> Result<(), Error> {
    let (cols, rows) = match &cli.screen_geometry {
        Some(arg) => config::parse_geometry(arg)?,
        None => (cast.header.cols, cast.header.rows),
    };

    let snapshots = replay::replay(cols, rows, &cast.events)?;
    log::debug!("replayed {} snapshots", snapshots.len());

    let timing = TimingOptions {
        min_frame_ms: cli.min_frame_duration,
        max_frame_ms: cli.max_frame_duration,
        loop_delay_ms: cli.loop_delay,
        idle_time_limit_ms: cast
            .header
            .idle_time_limit
            .map(|limit| (limit * 1000.0).round() as u64),
    };
    let (frames, loop_ms) = timing::normalise(snapshots, &timing)?;
    log::debug!("{} frames, loop duration {} ms", frames.len(), loop_ms);

    let source = config::load_template_source(&cli.template)?;
    let mut template = Template::parse(&source).map_err(Error::Template)?;
    template
        .scale_to(cols as usize, rows as usize)
        .map_err(Error::Template)?;

    let theme = cast.header.theme.as_ref();

    if cli.still_frames {
        let dir = match output {
            Some(path) => {
                fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
                path.to_path_buf()
            }
            None => config::temp_output_dir()?,
        };
        let paths = svg::write_still_frames(&template, &frames, theme, &dir, stem)?;
        println!(
            "Rendered {} still frames to {}",
            paths.len(),
            dir.display()
        );
    } else {
        let svg_path = match output {
            Some(path) => path.to_path_buf(),
            None => config::temp_output_path(".svg")?,
        };
        svg::compose_animation(&mut template, &frames, loop_ms, theme)?;
        svg::write_svg_file(&template, &svg_path)?;
        println!("Rendering ended, SVG animation is {}", svg_path.display());
    }
    Ok(())
}

fn run_record_and_render(cli: &Cli) -> Result<i32, Error> {
    let opts = record_options(cli)?;
    let cast_path = config::temp_output_path(".cast")?;

    let outcome = record_to_path(&opts, &cast_path)?;
    println!("Recording saved to {}", cast_path.display());

    let text = fs::read_to_string(&cast_path).map_err(|e| Error::io(&cast_path, e))?;
    let cast = parse_cast(&text)?;

    match render_cast(cli, &cast, None, "termtosvg") {
        Ok(()) => {}
        // An interrupted session with no output still saved its cast
        Err(Error::EmptyCast) if outcome.interrupted => {}
        Err(e) => return Err(e),
    }

    Ok(if outcome.interrupted {
        exit_code::SIGINT
    } else {
        exit_code::SUCCESS
    })
}

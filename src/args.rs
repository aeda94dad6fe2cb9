use std::io::Write;
use std::path::*;
use structopt::*;
use clap::arg_enum;
use thiserror::Error;
use crate::{config::*, fs_utils::*, log_utils::*, repo::*};

pub const INPUT_ROOT_ENV:  &str = "FITSRUN_INPUT_ROOT";
pub const CALIB_ROOT_ENV:  &str = "FITSRUN_CALIB_ROOT";
pub const OUTPUT_ROOT_ENV: &str = "FITSRUN_OUTPUT_ROOT";

arg_enum! {
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum ShowWhat {
        Data,
        Config,
        Exit,
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = "fitsrun", about = "Run an image processing task on single FITS files")]
pub struct FileArgs {
    /// input image file or repository directory
    #[structopt(parse(from_os_str))]
    pub input: PathBuf,

    /// data id in the form calexp=NAME
    #[structopt(long = "id", number_of_values = 1)]
    pub ids: Vec<String>,

    /// calibration repository directory
    #[structopt(long, parse(from_os_str))]
    pub calib: Option<PathBuf>,

    /// output repository directory
    #[structopt(long, parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// remove the existing output repository before processing
    #[structopt(long = "clobber-output")]
    pub clobber_output: bool,

    /// print the given item and continue (exit stops before processing)
    #[structopt(
        long = "show",
        number_of_values = 1,
        possible_values = &ShowWhat::variants(),
        case_insensitive = true
    )]
    pub show: Vec<ShowWhat>,

    /// shortcut for --loglevel DEBUG
    #[structopt(long)]
    pub debug: bool,

    /// log file destination
    #[structopt(long, parse(from_os_str))]
    pub logdest: Option<PathBuf>,

    /// logging level: DEBUG, INFO, WARN, FATAL or an integer threshold
    #[structopt(long)]
    pub loglevel: Option<String>,
}

/// Full generated help text, printed when the arguments are unusable.
pub fn usage_text() -> String {
    let mut app = FileArgs::clap();
    let mut buf = Vec::new();
    let _ = app.write_help(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Writes one `dataRef.dataId = calexp=NAME` line per reference.
pub fn show_data<W: Write>(data_refs: &[DataRef], stream: &mut W) -> std::io::Result<()> {
    for data_ref in data_refs {
        writeln!(stream, "dataRef.dataId = {}", data_ref.data_id)?;
    }
    Ok(())
}

/*****************************************************************************/

/* Resolution errors and outcome */

/// Failures of argument resolution. All of them end the program with
/// the argument-error exit status.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Path(String),

    #[error("{0}")]
    Config(String),
}

/// Everything a run needs after the command line is resolved.
pub struct RunContext {
    pub config: FrozenConfig,
    pub repo: FileRepo,
    pub data_refs: Vec<DataRef>,
    pub log_level: log::LevelFilter,
}

pub enum Resolved {
    Context(RunContext),
    /// --help, --version or --show exit: nothing to process, status 0.
    EarlyExit,
}

/*****************************************************************************/

/* Argument resolver */

/// Resolves raw command line arguments (without the program name) into a
/// run context. A plain file as the input argument is rewritten into its
/// directory plus a synthesized `--id calexp=<file name>`.
///
/// `overrides` may adjust the config; it runs after camera-specific
/// defaults and before flag handling.
pub fn resolve_args(
    raw_args:  &[String],
    overrides: impl FnOnce(&mut ProcessFileConfig)
) -> anyhow::Result<Resolved> {
    // the input must come first so it can be rewritten before real parsing
    if raw_args.is_empty()
    || raw_args[0].starts_with('-')
    || raw_args[0].starts_with('@') {
        return Err(CliError::Usage(
            "Input file or repository must be the first argument".to_string()
        ).into());
    }

    let mut input = fix_path(INPUT_ROOT_ENV, Some(Path::new(&raw_args[0])))
        .unwrap_or_else(|| PathBuf::from(&raw_args[0]));
    let mut rest: Vec<String> = raw_args[1..].to_vec();

    if !input.exists() {
        return Err(CliError::Path(
            format!("Error: input={} not found", input.display())
        ).into());
    }

    if !input.is_dir() {
        let file_name = extract_file_name(&input).to_string();
        let dir = input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        if file_name.is_empty() || !dir.is_dir() {
            return Err(CliError::Path(
                format!("Error: input={} is neither a file in a directory nor a directory", input.display())
            ).into());
        }
        log::debug!(
            "single file input: repo={}, id=calexp={}",
            dir.display(),
            file_name
        );
        rest.push("--id".to_string());
        rest.push(format!("calexp={}", file_name));
        input = dir;
    }

    let mut config = ProcessFileConfig::new();
    config.apply_camera_overrides();
    overrides(&mut config);

    let mut argv: Vec<String> = Vec::with_capacity(rest.len() + 2);
    argv.push("fitsrun".to_string());
    argv.push(path_to_str(&input).to_string());
    argv.extend(rest);

    let opts = match FileArgs::from_iter_safe(&argv) {
        Ok(opts) => opts,
        Err(e) if e.kind == clap::ErrorKind::HelpDisplayed
               || e.kind == clap::ErrorKind::VersionDisplayed => {
            println!("{}", e.message);
            return Ok(Resolved::EarlyExit);
        }
        Err(e) =>
            return Err(CliError::Usage(e.message).into()),
    };

    let mut log_level = match &opts.loglevel {
        Some(text) =>
            parse_log_level(text).map_err(|e| CliError::Config(e.to_string()))?,
        None =>
            log::LevelFilter::Info,
    };
    if opts.debug {
        log_level = log::LevelFilter::Debug;
    }

    // bad config values must be reported before anything touches the disk
    config.validate().map_err(|e| CliError::Config(e.to_string()))?;

    let calib = fix_path(CALIB_ROOT_ENV, opts.calib.as_deref());
    let output = fix_path(OUTPUT_ROOT_ENV, opts.output.as_deref());

    if opts.clobber_output {
        match &output {
            None =>
                return Err(CliError::Usage(
                    "--clobber-output is only valid with --output".to_string()
                ).into()),
            Some(out) if *out == input =>
                return Err(CliError::Path(
                    "--clobber-output is not valid when the output and input repos are the same".to_string()
                ).into()),
            Some(out) => {
                if out.exists() {
                    log::info!("removing output repo {}", out.display());
                    std::fs::remove_dir_all(out)?;
                }
            }
        }
    }

    log::info!("input={}", input.display());
    if let Some(calib) = &calib {
        log::info!("calib={}", calib.display());
    }
    if let Some(output) = &output {
        log::info!("output={}", output.display());
    }

    let mut ids: Vec<DataId> = Vec::new();
    for raw in &opts.ids {
        let name = raw
            .strip_prefix("calexp=")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CliError::Usage(
                format!("Unrecognized --id value `{}`: must have the form calexp=NAME", raw)
            ))?;
        ids.push(DataId::new(name));
    }

    let repo = FileRepo::new(input, calib, output);
    let data_refs = repo.make_refs(&ids);

    for show in &opts.show {
        match show {
            ShowWhat::Data => {
                show_data(&data_refs, &mut std::io::stdout())?;
            }
            ShowWhat::Config => {
                config.save_to_stream(&mut std::io::stdout())?;
            }
            ShowWhat::Exit => {
                return Ok(Resolved::EarlyExit);
            }
        }
    }

    let config = config
        .freeze()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(Resolved::Context(RunContext {
        config,
        repo,
        data_refs,
        log_level,
    }))
}

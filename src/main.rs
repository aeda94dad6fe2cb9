use fitsrun::{args::*, log_utils::*, task::*};

fn main() {
    let raw_args: Vec<String> = std::env::args().skip(1).collect();

    // logging options are pre-scanned so lines written during argument
    // resolution reach the destination the user asked for
    let (log_level, log_dest) = logging_from_args(&raw_args);
    let _logger = match start_logger(log_level, log_dest.as_deref()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to start logger: {}", e);
            None
        }
    };

    log::info!(
        "{} {} started",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let exit_code = run(&raw_args);
    std::process::exit(exit_code);
}

fn run(raw_args: &[String]) -> i32 {
    let context = match resolve_args(raw_args, |_config| {}) {
        Ok(Resolved::Context(context)) => context,
        Ok(Resolved::EarlyExit) => return 0,
        Err(e) => return report_failure(&e),
    };

    if context.data_refs.is_empty() {
        log::warn!("no data references to process");
    }

    let task = ProcessFileTask::new(&context.config);
    let processor = PassThroughProcessor;
    let mut failed = 0;

    for data_ref in &context.data_refs {
        match task.run(data_ref, &processor) {
            Ok(result) => {
                log::info!(
                    "{}: {} x {} pixels, {} sources, calib {}",
                    data_ref.data_id,
                    result.exposure.width(),
                    result.exposure.height(),
                    result.sources.len(),
                    if result.calib.is_some() { "set" } else { "none" }
                );
            }
            Err(e) => {
                log::error!("{}: {:#}", data_ref.data_id, e);
                eprintln!("{}: {:#}", data_ref.data_id, e);
                failed += 1;
            }
        }
    }

    if failed != 0 { 1 } else { 0 }
}

fn report_failure(error: &anyhow::Error) -> i32 {
    eprintln!("{:#}", error);
    match error.downcast_ref::<CliError>() {
        Some(CliError::Usage(_)) => {
            eprintln!("{}", usage_text());
            2
        }
        Some(_) => 2,
        None => 1,
    }
}

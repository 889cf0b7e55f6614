//! prompt-fanout — render a prompt batch and send it through the emulated client
//!
//! Usage:
//!   prompt-fanout [--job <path>] [--seed <n>] [--timeout-ms <n>] [--settled]

use prompt_fanout::batch::{BatchGenerator, DispatchConfig, Dispatcher, Prompts};
use prompt_fanout::client::{EmulatedClient, EmulatedClientConfig};
use prompt_fanout::types::RandomIdGenerator;
use prompt_fanout::BatchJob;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Options {
    job: Option<PathBuf>,
    seed: Option<u64>,
    timeout_ms: Option<u64>,
    settled: bool,
}

fn print_usage() {
    println!(
        r#"prompt-fanout — render a prompt batch and dispatch it concurrently

USAGE:
    prompt-fanout [OPTIONS]

OPTIONS:
    --job <path>          YAML or JSON job file (template + records); defaults to a built-in sample
    --seed <n>            Seed identifiers and emulated latency for a reproducible run
    --timeout-ms <n>      Per-request timeout in milliseconds
    --settled             Report every request's outcome instead of failing fast
    -V, --version         Show version information
    -h, --help            Show this help message

ENVIRONMENT:
    PROMPT_FANOUT_REQUEST_TIMEOUT_MS        Default per-request timeout
    PROMPT_FANOUT_EMULATED_MIN_DELAY_MS     Emulated latency lower bound (default 50)
    PROMPT_FANOUT_EMULATED_MAX_DELAY_MS     Emulated latency upper bound (default 1000)
    RUST_LOG                                Log filter (default: info)"#
    );
}

fn parse_args(args: &[String]) -> anyhow::Result<Option<Options>> {
    let mut opts = Options::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--job" => {
                let path = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--job requires a path"))?;
                opts.job = Some(PathBuf::from(path));
            }
            "--seed" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--seed requires a number"))?;
                opts.seed = Some(raw.parse()?);
            }
            "--timeout-ms" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--timeout-ms requires a number"))?;
                opts.timeout_ms = Some(raw.parse()?);
            }
            "--settled" => opts.settled = true,
            "version" | "--version" | "-V" => {
                println!("prompt-fanout {}", env!("CARGO_PKG_VERSION"));
                return Ok(None);
            }
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(Some(opts))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("{e}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let job = match &opts.job {
        Some(path) => BatchJob::load(path)?,
        None => BatchJob::sample(),
    };

    let generator = match opts.seed {
        Some(seed) => BatchGenerator::with_id_generator(Arc::new(RandomIdGenerator::with_seed(seed))),
        None => BatchGenerator::new(),
    };
    let requests = generator.render_requests(&job.template, &job.records)?;

    println!("Generated Prompts:");
    for request in &requests {
        println!("{}: {}", request.id, request.prompt);
    }

    let emulated = match opts.seed {
        Some(seed) => EmulatedClient::with_seed(seed.wrapping_add(1)),
        None => EmulatedClient::new(),
    };
    let client = Arc::new(emulated.with_config(EmulatedClientConfig::from_env())?);

    let mut config = DispatchConfig::from_env();
    if let Some(ms) = opts.timeout_ms {
        config = config.with_request_timeout(Duration::from_millis(ms));
    }
    let dispatcher = Dispatcher::with_config(config);
    let prompts: Prompts = requests
        .iter()
        .map(|r| (r.id, r.prompt.clone()))
        .collect();

    println!();
    println!("Results:");
    if opts.settled {
        let settled = dispatcher.dispatch_settled(&prompts, client).await;
        for request in &requests {
            match settled.get(&request.id) {
                Some(Ok(response)) => println!("{} -> {}", request.id, response),
                Some(Err(e)) => println!("{} !! {}", request.id, e),
                None => println!("{} !! missing", request.id),
            }
        }
    } else {
        let mut responses = dispatcher.dispatch(&prompts, client).await?;
        for request in &requests {
            if let Some(response) = responses.remove(&request.id) {
                println!("{} -> {}", request.id, response);
            }
        }
    }

    Ok(())
}

use std::io::{self, Write};
use std::process;
use std::sync::{mpsc, Arc};
use std::thread;

use clap::Parser;
use log::warn;

use svanity::estimate::estimate_confidence;
use svanity::gpu::{GpuOptions, GpuSearcher};
use svanity::keys::pubkey_to_base58;
use svanity::matcher::{Matcher, BASE58_ALPHABET};
use svanity::worker::{self, SearchContext};

#[derive(Parser)]
#[command(name = "svanity")]
#[command(version)]
#[command(about = "Generate Solana addresses with a given prefix")]
struct Args {
    /// The prefix for the address
    prefix: String,

    /// The number of threads to use [default: number of cores minus one]
    #[arg(short, long, value_name = "N")]
    threads: Option<usize>,

    /// Enable use of the GPU through OpenCL
    #[arg(short, long)]
    gpu: bool,

    /// Generate N addresses, then exit (0 for infinite)
    #[arg(short, long, value_name = "N", default_value_t = 1)]
    limit: u64,

    /// The number of GPU threads to use
    #[arg(long, value_name = "N", default_value_t = 1_048_576)]
    gpu_threads: usize,

    /// The GPU local work size. For advanced users only.
    #[arg(long, value_name = "N")]
    gpu_local_work_size: Option<usize>,

    /// The GPU global work size. For advanced users only.
    #[arg(long, value_name = "N")]
    gpu_global_work_size: Option<usize>,

    /// The GPU platform to use
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    gpu_platform: usize,

    /// The GPU device to use
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    gpu_device: usize,

    /// Disable progress output
    #[arg(long)]
    no_progress: bool,

    /// Output found keys in the form "[key] [address]"
    #[arg(long)]
    simple_output: bool,
}

fn main() {
    // Argument errors must exit with 1 rather than clap's default 2; help
    // and version still exit 0.
    let args = Args::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() { 1 } else { 0 };
        let _ = err.print();
        process::exit(code);
    });

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Some(c) = args.prefix.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
        eprintln!("error: prefix contains '{c}' which is not a valid base58 character");
        eprintln!(
            "       base58 excludes: 0 (zero), O (uppercase o), I (uppercase i), l (lowercase L)"
        );
        process::exit(1);
    }

    let matcher = match Matcher::compile(&args.prefix) {
        Ok(matcher) => matcher,
        Err(err) => {
            eprintln!("Failed to create matcher for prefix {}: {err}", args.prefix);
            process::exit(1);
        }
    };

    let num_threads = args
        .threads
        .unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(1)
        })
        .max(1);

    if !args.simple_output {
        print_search_plan(&matcher);
    }

    // Get the whole plan on the wire before any worker starts writing.
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    let ctx = Arc::new(SearchContext::new(
        matcher,
        args.limit,
        !args.no_progress,
        args.simple_output,
    ));
    let (matches_tx, matches_rx) = mpsc::channel();

    let mut handles = Vec::new();

    if !args.no_progress {
        let ctx = Arc::clone(&ctx);
        handles.push(thread::spawn(move || worker::progress_reporter(&ctx)));
    }

    for _ in 0..num_threads {
        let ctx = Arc::clone(&ctx);
        let tx = matches_tx.clone();
        handles.push(thread::spawn(move || worker::cpu_worker(&ctx, &tx)));
    }

    if args.gpu {
        let opts = GpuOptions {
            platform_idx: args.gpu_platform,
            device_idx: args.gpu_device,
            global_work_size: args.gpu_global_work_size.unwrap_or(args.gpu_threads),
            local_work_size: args.gpu_local_work_size,
        };

        // The GPU is an accelerator, not a requirement.
        match GpuSearcher::new(&opts, &ctx.matcher) {
            Ok(gpu) => {
                let ctx = Arc::clone(&ctx);
                let tx = matches_tx.clone();
                handles.push(thread::spawn(move || worker::gpu_worker(&ctx, &tx, gpu)));
            }
            Err(err) => {
                warn!("Failed to initialize GPU, continuing with CPU only: {err}");
            }
        }
    }

    // The writer runs on the main thread; it returns once the limit is
    // reached and the stop flag is up, after which every worker winds down
    // and the GPU context drops with its thread's scope.
    drop(matches_tx);
    worker::match_writer(&ctx, matches_rx);

    for handle in handles {
        let _ = handle.join();
    }

    if !args.simple_output {
        eprintln!("\nAll threads completed");
    }
}

fn print_search_plan(matcher: &Matcher) {
    eprintln!(
        "Searching for Solana addresses starting with: {}",
        matcher.prefix()
    );
    eprintln!("Using fast byte-level range matching");
    eprintln!(
        "Found {} range(s) for this prefix:\n",
        matcher.ranges().len()
    );

    let estimates = estimate_confidence(matcher);
    eprintln!("Estimated total attempts:");
    eprintln!(
        "  {} (50%), {} (90%), {} (99%)\n",
        estimates.p50, estimates.p90, estimates.p99
    );

    for (i, range) in matcher.ranges().iter().enumerate() {
        let min_addr = pubkey_to_base58(&range.min);
        let max_addr = pubkey_to_base58(&range.max);
        eprintln!("  Range {}:", i + 1);
        eprintln!(
            "    Min: {}, len: {} (0x{})",
            min_addr,
            min_addr.len(),
            hex::encode_upper(range.min)
        );
        eprintln!(
            "    Max: {}, len: {} (0x{})",
            max_addr,
            max_addr.len(),
            hex::encode_upper(range.max)
        );
    }
    eprintln!();
}

//! Search workers and the shared coordination state.
//!
//! Workers are tight compute loops with no yield points; the only
//! coordination is a stop flag polled once per iteration and two relaxed
//! counters. Matches travel through a channel to a single writer so that
//! records never tear across threads.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::warn;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::gpu::GpuSearcher;
use crate::keys::{derive_pubkey, increment_key, pubkey_to_base58};
use crate::matcher::Matcher;

/// A confirmed match on its way from a worker to the writer.
pub struct Found {
    pub key: [u8; 32],
    pub address: String,
}

/// State shared between the coordinator and every worker.
pub struct SearchContext {
    pub matcher: Matcher,
    /// Stop after this many matches; zero searches forever.
    pub limit: u64,
    pub output_progress: bool,
    pub simple_output: bool,
    pub attempts: AtomicU64,
    pub found_n: AtomicU64,
    stop: AtomicBool,
}

impl SearchContext {
    pub fn new(matcher: Matcher, limit: u64, output_progress: bool, simple_output: bool) -> Self {
        Self {
            matcher,
            limit,
            output_progress,
            simple_output,
            attempts: AtomicU64::new(0),
            found_n: AtomicU64::new(0),
            stop: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// CPU search loop: start from a random scalar and walk upward until told
/// to stop.
pub fn cpu_worker(ctx: &SearchContext, matches: &Sender<Found>) {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    cpu_worker_from(ctx, matches, key);
}

/// The loop body with an explicit starting scalar, fixed in tests.
pub fn cpu_worker_from(ctx: &SearchContext, matches: &Sender<Found>, mut key: [u8; 32]) {
    let prefix = ctx.matcher.prefix();

    while !ctx.stopped() {
        let pubkey = derive_pubkey(&key);

        if ctx.matcher.matches(&pubkey) {
            // Range edges admit a few keys whose address does not textually
            // start with the prefix; the encode round trip filters them.
            let address = pubkey_to_base58(&pubkey);
            if address.starts_with(prefix) && matches.send(Found { key, address }).is_err() {
                return;
            }
        }

        if ctx.output_progress {
            ctx.attempts.fetch_add(1, Ordering::Relaxed);
        }

        increment_key(&mut key);
    }
}

/// GPU driver loop: one fresh random root per launch, with the device
/// enumerating the 24-bit tail.
pub fn gpu_worker(ctx: &SearchContext, matches: &Sender<Found>, mut gpu: GpuSearcher) {
    let prefix = ctx.matcher.prefix();
    let batch = gpu.batch_size();

    while !ctx.stopped() {
        let mut key_root = [0u8; 32];
        OsRng.fill_bytes(&mut key_root);

        let outcome = gpu.compute(&key_root);

        if ctx.output_progress {
            ctx.attempts.fetch_add(batch, Ordering::Relaxed);
        }

        let key = match outcome {
            Ok(Some(key)) => key,
            Ok(None) => continue,
            Err(err) => {
                // Dropped candidates are always safe to skip; the search is
                // memoryless.
                warn!("GPU batch failed, skipping iteration: {err}");
                continue;
            }
        };

        // The device result is advisory until it re-derives on the CPU.
        let pubkey = derive_pubkey(&key);
        let address = pubkey_to_base58(&pubkey);
        if address.starts_with(prefix) {
            if matches.send(Found { key, address }).is_err() {
                return;
            }
        } else {
            warn!(
                "GPU returned non-matching solution: {}",
                hex::encode_upper(key)
            );
        }
    }
}

/// Progress line on stderr, refreshed every 250 ms.
pub fn progress_reporter(ctx: &SearchContext) {
    let start = Instant::now();

    while !ctx.stopped() {
        thread::sleep(Duration::from_millis(250));

        let attempts = ctx.attempts.load(Ordering::Relaxed);
        let elapsed = start.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            attempts as f64 / elapsed
        } else {
            0.0
        };

        eprint!("\rTried {} keys ({:.1} keys/s)", attempts, rate);
        let _ = io::stderr().flush();
    }
}

/// The single sink for match records.
///
/// Each record is written and flushed before `found_n` moves, so when the
/// counter reaches the limit, exactly that many records are on the wire and
/// the stop flag keeps any further ones from being emitted.
pub fn match_writer(ctx: &SearchContext, matches: Receiver<Found>) {
    for found in matches {
        if ctx.stopped() {
            break;
        }

        if ctx.output_progress {
            // Break out of the \r progress line.
            eprintln!();
        }

        if ctx.simple_output {
            let mut stdout = io::stdout().lock();
            let _ = writeln!(stdout, "{} {}", hex::encode_upper(found.key), found.address);
            let _ = stdout.flush();
        } else {
            let mut stderr = io::stderr().lock();
            let _ = write!(
                stderr,
                "Found matching account!\nPrivate Key: {}\nAddress:     {}\n",
                hex::encode_upper(found.key),
                found.address
            );
            let _ = stderr.flush();
        }

        let found_n = ctx.found_n.fetch_add(1, Ordering::Relaxed) + 1;
        if ctx.limit != 0 && found_n >= ctx.limit {
            ctx.request_stop();
            break;
        }
    }
}

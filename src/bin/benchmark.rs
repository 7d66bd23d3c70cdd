//! Trie operations benchmark.
//!
//! Generates byte-string keys sharing a pool of common prefixes, then times
//! insert and find against `BTreeMap` as the baseline ordered map. All
//! reporting goes to stderr.

use std::collections::BTreeMap;
use std::hint::black_box;
use std::process::ExitCode;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::error::ErrorKind;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use qtrie::Trie;

#[derive(Parser, Debug)]
#[command(name = "benchmark")]
#[command(about = "Trie vs BTreeMap insert/find benchmark on prefix-sharing keys")]
struct Args {
    /// RNG seed (0 means current time)
    #[arg(short = 's', long, default_value_t = 0)]
    rng_seed: u64,

    /// Number of generated keys
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    loop_count: usize,

    /// Number of pre-generated key prefixes
    #[arg(short = 'c', long, default_value_t = 12)]
    prefix_count: usize,

    /// Key prefix min. length
    #[arg(short = 'p', long, default_value_t = 8)]
    prefix_min: usize,

    /// Key prefix max. length
    #[arg(short = 'P', long, default_value_t = 64)]
    prefix_max: usize,

    /// Key min. length
    #[arg(short = 'k', long, default_value_t = 12)]
    key_min: usize,

    /// Key max. length
    #[arg(short = 'K', long, default_value_t = 256)]
    key_max: usize,

    /// Find key misses (in %)
    #[arg(short = 'm', long, default_value_t = 15)]
    misses_per100: u32,
}

fn item_key(item: &(Vec<u8>, i64)) -> &[u8] {
    &item.0
}

/// Random string over `alphabet` with length in `[len_min, len_max]`.
fn generate_string(rng: &mut StdRng, alphabet: &[u8], len_min: usize, len_max: usize) -> Vec<u8> {
    let len = rng.gen_range(len_min..=len_max);
    (0..len).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect()
}

/// Reports total and per-op times for both containers plus their ratio.
fn report(test: &str, loops: usize, trie_time: f64, map_time: f64) {
    eprintln!("{test}:");
    eprintln!(
        "qtrie time: {trie_time} s ({} s per op avg)",
        trie_time / loops as f64
    );
    eprintln!(
        "BTreeMap time: {map_time} s ({} s per op avg)",
        map_time / loops as f64
    );

    let mut ratio = map_time / trie_time;
    let trie_faster = ratio > 1.0;
    if !trie_faster {
        ratio = 1.0 / ratio;
    }
    let percent = (1000.0 * (ratio - 1.0)).trunc() / 10.0;
    eprintln!(
        "TRIE is {ratio} times {} than map (that's about {percent}%)",
        if trie_faster { "FASTER" } else { "SLOWER" }
    );
}

fn run(args: &Args) {
    eprintln!("String TRIE benchmark BEGIN");

    let mut rng = {
        let seed = if args.rng_seed == 0 {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(1)
        } else {
            args.rng_seed
        };
        eprintln!("RNG seeded with {seed}");
        StdRng::seed_from_u64(seed)
    };

    let alphabet: Vec<u8> = (0..64).map(|i| b'A' + i).collect();

    let prefixes: Vec<Vec<u8>> = (0..args.prefix_count)
        .map(|_| generate_string(&mut rng, &alphabet, args.prefix_min, args.prefix_max))
        .collect();

    let generate_key = |rng: &mut StdRng, len_min: usize, len_max: usize| -> Vec<u8> {
        let prefix = &prefixes[rng.gen_range(0..prefixes.len())];
        let mut key = prefix.clone();
        key.extend(generate_string(
            rng,
            &alphabet,
            len_min.saturating_sub(prefix.len()),
            len_max.saturating_sub(prefix.len()),
        ));
        key
    };

    let mut keys: Vec<Vec<u8>> = Vec::with_capacity(args.loop_count);
    let mut trie = Trie::new(item_key as fn(&(Vec<u8>, i64)) -> &[u8]);
    let mut map: BTreeMap<Vec<u8>, i64> = BTreeMap::new();

    // Insert benchmark
    let mut trie_time = 0.0;
    let mut map_time = 0.0;

    for i in 0..args.loop_count {
        let key = generate_key(&mut rng, args.key_min, args.key_max);
        keys.push(key.clone());

        let started = Instant::now();
        black_box(trie.insert((key.clone(), i as i64)));
        trie_time += started.elapsed().as_secs_f64();

        let started = Instant::now();
        black_box(map.entry(key).or_insert(i as i64));
        map_time += started.elapsed().as_secs_f64();
    }

    report("Insert", args.loop_count, trie_time, map_time);

    // Find benchmark
    let mut trie_time = 0.0;
    let mut map_time = 0.0;

    for _ in 0..args.loop_count {
        let key = if rng.gen_range(0..100) < args.misses_per100 {
            generate_key(&mut rng, args.key_min, args.key_max)
        } else {
            keys[rng.gen_range(0..keys.len())].clone()
        };

        let started = Instant::now();
        black_box(trie.find(&key));
        trie_time += started.elapsed().as_secs_f64();

        let started = Instant::now();
        black_box(map.get(&key));
        map_time += started.elapsed().as_secs_f64();
    }

    report("Search", args.loop_count, trie_time, map_time);

    eprintln!("String TRIE benchmark END");
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = err.print();
            return code;
        }
    };
    run(&args);
    ExitCode::SUCCESS
}

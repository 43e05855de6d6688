//! Walkthrough driver: exercises the table end to end and prints occupancy
//! statistics after each phase.
//!
//! Run with:
//!
//! ```sh
//! cargo run --example driver --features stats -- --capacity 30
//! ```

use clap::Parser;
use probe_hash::ProbeMap;

#[derive(Parser)]
struct Args {
    /// Requested starting capacity (clamped and rounded to a power of two).
    #[arg(long, default_value_t = 30)]
    capacity: usize,

    /// Load factor past which the table doubles.
    #[arg(long, default_value_t = 0.75)]
    load_factor: f32,
}

fn dump(map: &ProbeMap<String>, phase: &str) {
    println!("--- {phase} ---");
    map.stats().print();
    println!();
}

fn main() {
    let args = Args::parse();

    let mut map: ProbeMap<String> = ProbeMap::with_policies(
        args.capacity,
        args.load_factor,
        probe_hash::Djb2,
        probe_hash::BytewiseEq,
        probe_hash::DropRelease,
    );

    for i in 0..12 {
        map.insert(format!("key{i}").as_bytes(), format!("value{i}"))
            .unwrap();
    }
    dump(&map, "after 12 insertions");

    for i in (0..12).step_by(2) {
        let removed = map.remove(format!("key{i}").as_bytes());
        assert!(removed.is_some(), "key{i} should have been present");
    }
    dump(&map, "after removing the even keys");

    for i in 100..106 {
        map.insert(format!("key{i}").as_bytes(), format!("value{i}"))
            .unwrap();
    }
    dump(&map, "after reinserting into tombstoned buckets");

    for i in 200..230 {
        map.insert(format!("key{i}").as_bytes(), format!("value{i}"))
            .unwrap();
    }
    dump(&map, "after growing past the threshold");

    map.insert(b"", "empty key".to_string()).unwrap();
    println!("empty key maps to: {:?}", map.get(b""));

    let oversized = [b'x'; 33];
    match map.insert(&oversized, "too long".to_string()) {
        Err(err) => println!("33-byte key rejected: {err}"),
        Ok(_) => unreachable!("oversized keys must be rejected"),
    }

    println!("\nfinal contents ({} entries):", map.len());
    let mut entries: Vec<(String, String)> = map
        .iter()
        .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v.clone()))
        .collect();
    entries.sort();
    for (key, value) in entries {
        println!("  {key:>8} => {value}");
    }
}

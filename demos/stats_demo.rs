use std::hash::BuildHasher;
use std::hash::RandomState;

use clap::Parser;
use swiss_table::HashTable;
use swiss_table::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    /// Capacity requested up front.
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Percentage of elements removed and reinserted after the fill, to
    /// leave tombstones behind.
    #[arg(short = 'r', long = "churn_percent", default_value_t = 0)]
    churn_percent: u64,
}

fn main() {
    let args = Args::parse();
    let state = RandomState::new();
    let hasher = |v: &u64| state.hash_one(v);

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity);
    println!(
        "Requested capacity {}, got {}",
        args.target_capacity,
        table.capacity()
    );

    let num_values = table.capacity() as u64;
    for value in 0..num_values {
        match table.try_entry(hasher(&value), |&v| v == value, hasher) {
            Ok(Entry::Vacant(entry)) => {
                entry.insert(value);
            }
            Ok(Entry::Occupied(_)) => panic!("value already in table: {value}"),
            Err(e) => panic!("insert of {value} failed: {e}"),
        }
    }
    println!("Inserted {} values without growing", table.len());

    let churned = num_values * args.churn_percent.min(100) / 100;
    for value in 0..churned {
        table.remove(hasher(&value), |&v| v == value);
        let fresh = value + num_values;
        table.insert_unique(hasher(&fresh), fresh, hasher);
    }
    if churned > 0 {
        println!("Churned {churned} values");
    }

    table.probe_histogram(hasher).print();
    table.debug_stats().print();
}

use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use rand::Rng;
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

trait BenchItem: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

fn sip_hash(value: impl Hash) -> u64 {
    let mut hasher = SipHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[derive(Clone)]
struct SmallItem {
    key: u64,
}

impl BenchItem for SmallItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        sip_hash(self.key)
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct StringItem {
    key: String,
    _value: u64,
}

impl BenchItem for StringItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{key:016X}"),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        sip_hash(&self.key)
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

/// The operations every benchmark drives, implemented for both tables.
trait Contender<T: BenchItem>: Sized {
    const NAME: &'static str;

    fn with_capacity(capacity: usize) -> Self;
    fn insert(&mut self, hash: u64, item: T);
    fn find(&self, hash: u64, item: &T) -> Option<&T>;
    fn remove(&mut self, hash: u64, item: &T) -> Option<T>;
    fn sum_keys(&self) -> u64;
}

impl<T: BenchItem> Contender<T> for swiss_table::HashTable<T> {
    const NAME: &'static str = "swiss_table";

    fn with_capacity(capacity: usize) -> Self {
        swiss_table::HashTable::with_capacity(capacity)
    }

    fn insert(&mut self, hash: u64, item: T) {
        self.insert_unique(hash, item, T::hash_key);
    }

    fn find(&self, hash: u64, item: &T) -> Option<&T> {
        swiss_table::HashTable::find(self, hash, |v| v.eq_key(item))
    }

    fn remove(&mut self, hash: u64, item: &T) -> Option<T> {
        swiss_table::HashTable::remove(self, hash, |v| v.eq_key(item))
    }

    fn sum_keys(&self) -> u64 {
        self.iter().map(|v| v.hash_key() & 0xFF).sum()
    }
}

impl<T: BenchItem> Contender<T> for hashbrown::HashTable<T> {
    const NAME: &'static str = "hashbrown";

    fn with_capacity(capacity: usize) -> Self {
        hashbrown::HashTable::with_capacity(capacity)
    }

    fn insert(&mut self, hash: u64, item: T) {
        self.insert_unique(hash, item, T::hash_key);
    }

    fn find(&self, hash: u64, item: &T) -> Option<&T> {
        hashbrown::HashTable::find(self, hash, |v| v.eq_key(item))
    }

    fn remove(&mut self, hash: u64, item: &T) -> Option<T> {
        match hashbrown::HashTable::find_entry(self, hash, |v| v.eq_key(item)) {
            Ok(entry) => Some(entry.remove().0),
            Err(_) => None,
        }
    }

    fn sum_keys(&self) -> u64 {
        self.iter().map(|v| v.hash_key() & 0xFF).sum()
    }
}

const SIZES: &[usize] = &[1 << 10, 1 << 12, 1 << 14, 1 << 16, 1 << 18];

fn items<T: BenchItem>(keys: impl Iterator<Item = u64>) -> Vec<(u64, T)> {
    keys.map(|key| {
        let item = T::new(key);
        (item.hash_key(), item)
    })
    .collect()
}

fn filled<T: BenchItem, C: Contender<T>>(items: &[(u64, T)]) -> C {
    let mut table = C::with_capacity(0);
    for (hash, item) in items.iter().cloned() {
        table.insert(hash, item);
    }
    table
}

fn group<'a>(c: &'a mut Criterion, name: &str) -> BenchmarkGroup<'a, WallTime> {
    let mut group = c.benchmark_group(name);
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    group
}

fn insert_grow<T: BenchItem, C: Contender<T>>(group: &mut BenchmarkGroup<'_, WallTime>, size: usize) {
    let mut rng = SmallRng::seed_from_u64(size as u64);
    let items = items::<T>((0..size).map(|_| rng.random()));

    group.throughput(Throughput::Elements(size as u64));
    group.bench_function(format!("{}/{size}", C::NAME), |b| {
        b.iter_batched(
            || items.clone(),
            |items| {
                let mut table = C::with_capacity(0);
                for (hash, item) in items {
                    table.insert(hash, item);
                }
                black_box(table)
            },
            BatchSize::SmallInput,
        )
    });
}

fn find_hit_and_miss<T: BenchItem, C: Contender<T>>(
    group: &mut BenchmarkGroup<'_, WallTime>,
    size: usize,
) {
    let present = items::<T>(0..size as u64);
    let absent = items::<T>(size as u64..2 * size as u64);
    let table: C = filled(&present);

    let mut probes = present.clone();
    probes.extend(absent);
    probes.shuffle(&mut SmallRng::seed_from_u64(7));

    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function(format!("{}/{size}", C::NAME), |b| {
        b.iter(|| {
            let mut hits = 0usize;
            for (hash, item) in &probes {
                hits += table.find(*hash, item).is_some() as usize;
            }
            black_box(hits)
        })
    });
}

fn find_zipf<T: BenchItem, C: Contender<T>>(group: &mut BenchmarkGroup<'_, WallTime>, size: usize) {
    let present = items::<T>(0..size as u64);
    let table: C = filled(&present);

    let Ok(zipf) = Zipf::new(size as f64, 1.1) else {
        return;
    };
    let mut rng = SmallRng::seed_from_u64(11);
    let probes: Vec<usize> = (0..size)
        .map(|_| (zipf.sample(&mut rng) as usize).saturating_sub(1))
        .collect();

    group.throughput(Throughput::Elements(probes.len() as u64));
    group.bench_function(format!("{}/{size}", C::NAME), |b| {
        b.iter(|| {
            for &index in &probes {
                let (hash, item) = &present[index];
                black_box(table.find(*hash, item));
            }
        })
    });
}

/// Remove-then-insert at a steady size, which leaves tombstones behind and
/// exercises in-place rehashing.
fn churn<T: BenchItem, C: Contender<T>>(group: &mut BenchmarkGroup<'_, WallTime>, size: usize) {
    let live = items::<T>(0..size as u64);
    let fresh = items::<T>(size as u64..2 * size as u64);

    group.throughput(Throughput::Elements(size as u64));
    group.bench_function(format!("{}/{size}", C::NAME), |b| {
        b.iter_batched(
            || filled::<T, C>(&live),
            |mut table| {
                for ((old_hash, old), (hash, item)) in live.iter().zip(fresh.iter().cloned()) {
                    black_box(table.remove(*old_hash, old));
                    table.insert(hash, item);
                }
                black_box(table)
            },
            BatchSize::LargeInput,
        )
    });
}

fn iterate<T: BenchItem, C: Contender<T>>(group: &mut BenchmarkGroup<'_, WallTime>, size: usize) {
    let table: C = filled(&items::<T>(0..size as u64));

    group.throughput(Throughput::Elements(size as u64));
    group.bench_function(format!("{}/{size}", C::NAME), |b| {
        b.iter(|| black_box(table.sum_keys()))
    });
}

fn run_both<T: BenchItem>(
    c: &mut Criterion,
    name: &str,
    swiss: fn(&mut BenchmarkGroup<'_, WallTime>, usize),
    brown: fn(&mut BenchmarkGroup<'_, WallTime>, usize),
) {
    let mut group = group(c, &format!("{name}_{}", core::any::type_name::<T>()));
    for &size in SIZES {
        swiss(&mut group, size);
        brown(&mut group, size);
    }
    group.finish();
}

macro_rules! compare {
    ($c:expr, $name:literal, $bench:ident, $item:ty) => {
        run_both::<$item>(
            $c,
            $name,
            $bench::<$item, swiss_table::HashTable<$item>>,
            $bench::<$item, hashbrown::HashTable<$item>>,
        )
    };
}

fn benches_small(c: &mut Criterion) {
    compare!(c, "insert_grow", insert_grow, SmallItem);
    compare!(c, "find_hit_and_miss", find_hit_and_miss, SmallItem);
    compare!(c, "find_zipf", find_zipf, SmallItem);
    compare!(c, "churn", churn, SmallItem);
    compare!(c, "iterate", iterate, SmallItem);
}

fn benches_string(c: &mut Criterion) {
    compare!(c, "insert_grow", insert_grow, StringItem);
    compare!(c, "find_hit_and_miss", find_hit_and_miss, StringItem);
    compare!(c, "churn", churn, StringItem);
}

criterion_group!(benches, benches_small, benches_string);
criterion_main!(benches);

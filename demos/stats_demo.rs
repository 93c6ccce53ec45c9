use clap::Parser;
use oa_hash::Config;
use oa_hash::DeletionPolicy;
use oa_hash::HashTable;
use oa_hash::Slot;
use oa_hash::hashers;

#[derive(Parser, Debug)]
struct Args {
    /// Number of entries to insert.
    #[arg(short = 'n', long = "entries", default_value_t = 10_000)]
    entries: usize,

    /// Use the Pack deletion policy instead of Mark.
    #[arg(long)]
    pack: bool,
}

fn main() {
    let args = Args::parse();
    let policy = if args.pack {
        DeletionPolicy::Pack
    } else {
        DeletionPolicy::Mark
    };

    let mut table = HashTable::new(Config {
        initial_size: 11,
        secondary_hash: Some(hashers::secondary),
        deletion_policy: policy,
        ..Config::new(hashers::primary)
    });

    println!("Inserting {} entries ({policy:?} deletion)...", args.entries);
    for i in 0..args.entries {
        let key = format!("entry-{i:08}");
        if let Err(err) = table.insert(&key, i as u64) {
            panic!("insert failed for {key}: {err}");
        }
    }

    // Pack compaction scans with the removed key's stride only, so under
    // per-key strides some entries can become unreachable; count rather
    // than panic on those.
    println!("Removing every third entry...");
    let mut missed = 0usize;
    for i in (0..args.entries).step_by(3) {
        let key = format!("entry-{i:08}");
        if table.remove(&key).is_err() {
            missed += 1;
        }
    }

    let stats = table.stats();
    let tombstones = table
        .slots()
        .iter()
        .filter(|slot| matches!(slot, Slot::Deleted))
        .count();

    println!("Table size:  {}", stats.table_size);
    println!("Count:       {}", stats.count);
    println!("Load factor: {:.2}%", stats.load_factor * 100.0);
    println!("Probes:      {}", stats.probes);
    println!("Expansions:  {}", stats.expansions);
    println!("Tombstones:  {tombstones}");
    if missed > 0 {
        println!("Removals that missed their key: {missed}");
    }
}

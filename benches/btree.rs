use criterion::{criterion_group, criterion_main, Criterion};
use pagetree::{BPlusTree, TreeConfig, Value};
use tempfile::TempDir;

fn setup() -> (BPlusTree, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let tree = BPlusTree::open(dir.path().join("bench.db"), TreeConfig::default()).unwrap();
    (tree, dir)
}

fn key(i: u64) -> String {
    format!("key{:08}", i)
}

fn bench_sequential_insert(c: &mut Criterion) {
    for n in [100u64, 1000] {
        c.bench_function(&format!("sequential_insert_{n}"), |b| {
            b.iter(|| {
                let (mut tree, _dir) = setup();
                for i in 0..n {
                    tree.insert(&key(i), Value::int(i as i64)).unwrap();
                }
            });
        });
    }
}

fn bench_search(c: &mut Criterion) {
    for n in [100u64, 1000] {
        let (mut tree, _dir) = setup();
        for i in 0..n {
            tree.insert(&key(i), Value::int(i as i64)).unwrap();
        }

        c.bench_function(&format!("search_hit_{n}"), |b| {
            b.iter(|| {
                for i in 0..n {
                    tree.search(&key(i)).unwrap();
                }
            });
        });
        c.bench_function(&format!("search_miss_{n}"), |b| {
            b.iter(|| {
                for i in n..2 * n {
                    tree.search(&key(i)).unwrap();
                }
            });
        });
    }
}

criterion_group!(benches, bench_sequential_insert, bench_search);
criterion_main!(benches);

//! Benchmark for strategy generation and scoring

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use storage_planner::domain::ports::{Disk, DiskDescriptor, SystemInfo, GIB, TIB};
use storage_planner::hardware::parse_lsblk;
use storage_planner::strategy::{two_disk_recommendations, StrategyConfig, StrategyGenerator};
use storage_planner::ModelStringRaidDetector;

fn make_disks(count: usize) -> Vec<Disk> {
    (0..count)
        .map(|i| {
            let nvme = i % 3 == 0;
            Disk::from_descriptor(DiskDescriptor {
                name: if nvme { format!("nvme{}n1", i) } else { format!("sd{}", i) },
                size_bytes: (i as u64 % 4 + 1) * TIB,
                rotational: !nvme,
                transport: if nvme { "nvme".into() } else { "sata".into() },
                model: format!("Disk Model {}", i),
                ..Default::default()
            })
        })
        .collect()
}

fn system() -> SystemInfo {
    SystemInfo {
        total_ram_bytes: 16 * GIB,
        hardware_raid: false,
    }
}

fn bench_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_generation");
    let generator = StrategyGenerator::new();

    for count in [0usize, 1, 2, 8, 32] {
        let disks = make_disks(count);
        group.throughput(Throughput::Elements(count.max(1) as u64));
        group.bench_with_input(BenchmarkId::new("recommend", count), &disks, |b, disks| {
            b.iter(|| generator.recommend(black_box(disks), system()));
        });
    }

    group.finish();
}

fn bench_two_disk_ranks(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_generation");
    let disks = make_disks(2);
    let layout = StrategyConfig::default();
    let raid = ModelStringRaidDetector::new();

    group.bench_function("two_disk_ranks", |b| {
        b.iter(|| two_disk_recommendations(black_box(&disks), system(), &raid, &layout));
    });

    group.finish();
}

fn bench_parse_lsblk(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy_generation");
    let devices: Vec<String> = (0..24)
        .map(|i| {
            format!(
                r#"{{"name":"sd{i}","path":"/dev/sd{i}","size":4000787030016,"type":"disk","model":"WDC WD40EFRX","serial":"WD-{i}","rota":true,"rm":false,"tran":"sata","mountpoint":null,"fstype":null,"children":[]}}"#
            )
        })
        .collect();
    let document = format!(r#"{{"blockdevices":[{}]}}"#, devices.join(","));

    group.throughput(Throughput::Elements(24));
    group.bench_function("parse_lsblk", |b| {
        b.iter(|| parse_lsblk(black_box(&document)));
    });

    group.finish();
}

criterion_group!(benches, bench_recommend, bench_two_disk_ranks, bench_parse_lsblk);
criterion_main!(benches);

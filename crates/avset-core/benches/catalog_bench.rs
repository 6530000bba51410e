//! Criterion benchmarks for catalog lookups and automatic mode selection.
//!
//! Run with:
//! ```bash
//! cargo bench --package avset-core --bench catalog_bench
//! ```

use avset_core::domain::monitor::{resbit, ResolutionReport};
use avset_core::domain::negotiator::{resbits_to_vid, AutoModeSelector};
use avset_core::domain::video_mode::{resolution_of, table_id_for};
use avset_core::protocol::messages::vid;
use avset_core::{ModeId, MonitorInfo, MonitorType, Region};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_lookups(c: &mut Criterion) {
    c.bench_function("table_id_for/last_entry", |b| {
        b.iter(|| table_id_for(black_box(vid::VID_WUXGA)))
    });
    c.bench_function("resolution_of", |b| {
        b.iter(|| resolution_of(black_box(ModeId::from_raw(0x0045))))
    });
    c.bench_function("resbits_to_vid", |b| {
        b.iter(|| resbits_to_vid(black_box(resbit::MASK_50), black_box(resbit::R1280X720P)))
    });
}

fn bench_selector(c: &mut Criterion) {
    let info = MonitorInfo {
        port: 0,
        monitor_type: MonitorType::Hdmi,
        res_60: ResolutionReport {
            native: 0,
            res_bits: resbit::MASK_60,
        },
        res_50: ResolutionReport::default(),
        name: "bench".into(),
    };

    c.bench_function("auto_mode/boot_single_hdmi", |b| {
        b.iter(|| {
            let mut selector = AutoModeSelector::new(Region::HZ_60, true);
            let _ = selector.observe(black_box(info.clone()));
            selector.finish()
        })
    });
}

criterion_group!(benches, bench_lookups, bench_selector);
criterion_main!(benches);

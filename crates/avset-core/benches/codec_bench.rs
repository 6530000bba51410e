//! Criterion benchmarks for the frame codec and the batched set-parameters
//! builder.
//!
//! Run with:
//! ```bash
//! cargo bench --package avset-core --bench codec_bench
//! ```

use avset_core::domain::video_mode::VIDEO_MODES;
use avset_core::protocol::commands::{self, AvbParam};
use avset_core::protocol::frame::{build_request, decode_header};
use avset_core::protocol::messages::{avport, color_space, head, Mute};
use avset_core::{AvPort, Cid, CommandTable, ModeFlags, ModeId};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_header(c: &mut Criterion) {
    let frame = build_request(Cid::AV_TV_MUTE, &[0, 0, 0, 1]).unwrap_or_default();

    c.bench_function("build_request/tv_mute", |b| {
        b.iter(|| build_request(black_box(Cid::AV_TV_MUTE), black_box(&[0, 0, 0, 1])))
    });
    c.bench_function("decode_header", |b| b.iter(|| decode_header(black_box(&frame))));
}

fn bench_classify(c: &mut Criterion) {
    let table = CommandTable::standard();
    c.bench_function("classify/reply", |b| {
        b.iter(|| table.classify(black_box(Cid::AV_GET_MONITOR_INFO.reply())))
    });
    c.bench_function("classify/event", |b| {
        b.iter(|| table.classify(black_box(Cid(0x1001_0002))))
    });
}

fn bench_avb_param(c: &mut Criterion) {
    let id = ModeId::new(5, ModeFlags::NONE);
    let mode = &VIDEO_MODES[5];
    let ports = [AvPort(avport::HDMI_0), AvPort(avport::AVMULTI_0)];

    c.bench_function("avb_param/full_video_batch", |b| {
        b.iter(|| {
            let mut avb = AvbParam::new();
            for h in [head::HEAD_A, head::HEAD_B] {
                avb.push_video_mode(h, mode, id);
            }
            for port in ports {
                avb.push_av_video_cs(port, mode, color_space::RGB_8, id);
            }
            black_box(avb.into_request())
        })
    });
    c.bench_function("av_video_mute/one_port", |b| {
        b.iter(|| commands::av_video_mute(black_box(&ports[..1]), Mute::On))
    });
}

criterion_group!(benches, bench_header, bench_classify, bench_avb_param);
criterion_main!(benches);

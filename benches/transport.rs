//! Transport layer performance benchmarks
//!
//! Measures fragmentation, reassembly and the full inbound path.

use std::sync::Arc;

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nanolink::transport::{
    Frame, GattProfile, LinkError, MAX_FRAME_PAYLOAD, Reassembler, fragment,
};
use nanolink::{Connection, Link, LinkConfig, MediaInfoPacket, Packet, PacketType};

/// Benchmark splitting payloads into frames
fn bench_fragment(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragment");

    for size in [64usize, 512, 1890] {
        let payload = Bytes::from(vec![0xA5u8; size]);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(fragment(PacketType::MediaInfo, payload, MAX_FRAME_PAYLOAD)));
        });
    }

    group.finish();
}

/// Benchmark feeding frames through the reassembler
fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");

    for size in [64usize, 512, 1890] {
        let payload = Bytes::from(vec![0x5Au8; size]);
        let frames: Vec<Frame> = fragment(PacketType::MediaInfo, &payload, MAX_FRAME_PAYLOAD)
            .unwrap()
            .iter()
            .map(|frame| Frame::decode(frame.encode()).unwrap())
            .collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &frames, |b, frames| {
            let mut reassembler = Reassembler::new();
            b.iter(|| {
                let mut done = None;
                for frame in frames {
                    done = reassembler.push(frame).unwrap();
                }
                black_box(done)
            });
        });
    }

    group.finish();
}

struct Sink;

impl Link for Sink {
    fn write(&self, _frame: &[u8]) -> Result<(), LinkError> {
        Ok(())
    }

    fn enable_notifications(&self, _profile: &GattProfile) -> Result<(), LinkError> {
        Ok(())
    }
}

/// Benchmark chunk-to-packet delivery through a ready connection
fn bench_inbound(c: &mut Criterion) {
    let mut group = c.benchmark_group("inbound");

    let connection = Connection::new(Arc::new(Sink), LinkConfig::default().without_delays());
    connection.connect().unwrap();
    connection.on_service_resolved(GattProfile::SERVICE).unwrap();

    let packet = Packet::from(MediaInfoPacket {
        title: "t".repeat(300),
        artist: "Artist".into(),
        album: "Album".into(),
        duration: 215_000,
        position: 0,
        is_playing: true,
    });
    let payload = packet.encode().unwrap();
    let chunks: Vec<Bytes> = fragment(packet.packet_type(), &payload, MAX_FRAME_PAYLOAD)
        .unwrap()
        .iter()
        .map(Frame::encode)
        .collect();

    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("media_info_3_frames", |b| {
        b.iter(|| {
            let mut done = None;
            for chunk in &chunks {
                done = connection.on_data(chunk).unwrap();
            }
            black_box(done)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fragment, bench_reassemble, bench_inbound);
criterion_main!(benches);

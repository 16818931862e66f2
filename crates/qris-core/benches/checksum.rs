//! Benchmarks for checksum and payload generation

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qris_core::{compute_checksum, extract_amount, generate_dynamic_payload};

const STATIC_QRIS: &str = "00020101021126630016ID.CO.SHOPEE.WWW0118936009151234567890021054031234560303UME51440014ID.CO.QRIS.WWW0215ID10200000123450303UME5204581253033605802ID5919TOKO KOPI 5405 JAYA6013JAKARTA PUSAT61051011062120708K54-TOKO63042EEC";
const LOOSE_QRIS: &str = "00020101021226670016ID.CO.SHOPEE.WWW011893600915123456780303UME51440014ID.CO.QRIS.WWW0215ID102000001234503033605802ID5909TestMerch6007Jakarta6105123456304XXXX";

fn benchmark_checksum(c: &mut Criterion) {
    let long = STATIC_QRIS.repeat(4);

    c.bench_function("crc16_221_bytes", |b| {
        b.iter(|| compute_checksum(black_box(STATIC_QRIS)))
    });

    c.bench_function("crc16_884_bytes", |b| {
        b.iter(|| compute_checksum(black_box(&long)))
    });
}

fn benchmark_generation(c: &mut Criterion) {
    let dynamic = generate_dynamic_payload(STATIC_QRIS, 15000).unwrap();

    c.bench_function("generate_tlv", |b| {
        b.iter(|| generate_dynamic_payload(black_box(STATIC_QRIS), black_box(15000)))
    });

    c.bench_function("generate_marker_scan", |b| {
        b.iter(|| generate_dynamic_payload(black_box(LOOSE_QRIS), black_box(15000)))
    });

    c.bench_function("extract_amount", |b| {
        b.iter(|| extract_amount(black_box(&dynamic)))
    });
}

criterion_group!(benches, benchmark_checksum, benchmark_generation);
criterion_main!(benches);

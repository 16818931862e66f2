//! Render a dynamic payload and read it back with a real decoder

use qris_core::{extract_amount, generate_dynamic_payload, render, RenderOptions};

const STATIC_QRIS: &str = "00020101021126630016ID.CO.SHOPEE.WWW0118936009151234567890021054031234560303UME51440014ID.CO.QRIS.WWW0215ID10200000123450303UME5204581253033605802ID5919TOKO KOPI 5405 JAYA6013JAKARTA PUSAT61051011062120708K54-TOKO63042EEC";

fn decode_png(png: &[u8]) -> String {
    let img = image::load_from_memory(png).expect("Failed to load PNG").to_luma8();
    let mut prepared = rqrr::PreparedImage::prepare(img);
    let grids = prepared.detect_grids();
    assert_eq!(grids.len(), 1, "expected exactly one QR grid");
    let (_meta, content) = grids[0].decode().expect("QR should decode");
    content
}

#[test]
fn test_rendered_payload_scans_back() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    for amount in [1500, 15000, 999_999_999] {
        let payload = generate_dynamic_payload(STATIC_QRIS, amount).unwrap();
        let png = render(&payload, &RenderOptions::png(400)).unwrap();

        let scanned = decode_png(&png);
        assert_eq!(scanned, payload);
        assert_eq!(extract_amount(&scanned), Some(amount));
    }
}

use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(w, h, px.repeat((w * h) as usize)).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_photo_keeps_straight_alpha() {
    let photo = decode_photo(&png_bytes(1, 1, [100, 50, 200, 128])).unwrap();
    assert_eq!((photo.width(), photo.height()), (1, 1));
    assert_eq!(photo.rgba8(), &[100, 50, 200, 128]);
}

#[test]
fn decode_photo_rejects_garbage() {
    assert!(decode_photo(b"not an image").is_err());
}

#[test]
fn template_art_is_resized_to_canvas() {
    let canvas = Canvas::new(8, 6).unwrap();
    let art = decode_template_art(&png_bytes(4, 3, [10, 20, 30, 255]), canvas).unwrap();
    assert_eq!((art.width, art.height), (8, 6));
    for (got, want) in art.pixel(7, 5).iter().zip([10u8, 20, 30, 255]) {
        assert!((i16::from(*got) - i16::from(want)).abs() <= 1);
    }
}

#[test]
fn encode_png_roundtrips_pixels() {
    let raster = RasterRgba8::filled(3, 2, [1, 2, 3, 4]).unwrap();
    let png = encode_png(&raster).unwrap();
    let photo = decode_photo(&png).unwrap();
    assert_eq!(photo.rgba8(), raster.data.as_slice());
}

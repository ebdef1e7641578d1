#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// A minimal baseline JPEG header: SOI, JFIF APP0, SOF0 and EOI.
///
/// Carries no scan data; it only has to be recognized as JPEG and report
/// its dimensions.
pub fn jpeg_bytes(width: u16, height: u16) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]);
    bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&[0x03, 0x01, 0x22, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01]);
    bytes.extend_from_slice(&[0xFF, 0xD9]);
    bytes
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 2, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes
}

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write file");
}

pub fn write_jpeg(path: &Path, width: u16, height: u16) {
    write_file(path, jpeg_bytes(width, height));
}

/// One box: label and pixel corners `[xmin, ymin, xmax, ymax]`.
pub type Shape<'a> = (&'a str, [f64; 4]);

/// Writes `<dir>/<stem>.json` (LabelMe style) and its JPEG.
pub fn write_json_sample(dir: &Path, stem: &str, size: (u16, u16), shapes: &[Shape]) -> PathBuf {
    let shapes: Vec<String> = shapes
        .iter()
        .map(|(label, [x1, y1, x2, y2])| {
            format!(
                r#"{{"label": "{label}", "points": [[{x1}, {y1}], [{x2}, {y2}]], "shape_type": "rectangle"}}"#
            )
        })
        .collect();
    let path = dir.join(format!("{stem}.json"));
    write_file(
        &path,
        format!(
            r#"{{"version": "5.0.1", "imagePath": "{stem}.jpg", "shapes": [{}], "imageWidth": 1, "imageHeight": 1}}"#,
            shapes.join(", ")
        ),
    );
    write_jpeg(&dir.join(format!("{stem}.jpg")), size.0, size.1);
    path
}

/// Writes `<dir>/<stem>.xml` (Pascal VOC) and its JPEG.
pub fn write_voc_sample(dir: &Path, stem: &str, size: (u16, u16), shapes: &[Shape]) -> PathBuf {
    let objects: String = shapes
        .iter()
        .map(|(label, [x1, y1, x2, y2])| {
            format!(
                "  <object>\n    <name>{label}</name>\n    <bndbox><xmin>{x1}</xmin><ymin>{y1}</ymin><xmax>{x2}</xmax><ymax>{y2}</ymax></bndbox>\n  </object>\n"
            )
        })
        .collect();
    let path = dir.join(format!("{stem}.xml"));
    write_file(
        &path,
        format!(
            "<annotation>\n  <folder>images</folder>\n  <filename>{stem}.jpg</filename>\n  <size><width>{}</width><height>{}</height><depth>3</depth></size>\n{objects}</annotation>\n",
            size.0, size.1
        ),
    );
    write_jpeg(&dir.join(format!("{stem}.jpg")), size.0, size.1);
    path
}

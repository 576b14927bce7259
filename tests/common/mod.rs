#![allow(dead_code)]

use std::fs;
use std::path::Path;

use image::{GrayImage, Luma};

/// Creates `<root>/color/<name>` for every name. Image content is never
/// decoded by the store, so the files only hold a placeholder.
pub fn make_collection(root: &Path, names: &[&str]) {
    let color = root.join("color");
    fs::create_dir_all(&color).expect("create color dir");
    for name in names {
        fs::write(color.join(name), b"xray").expect("write image file");
    }
}

/// A `w` x `h` mask filled with `value`, so masks can be told apart after
/// renumbering.
pub fn filled_mask(w: u32, h: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(w, h, Luma([value]))
}

pub fn write_png_mask(path: &Path, w: u32, h: u32, value: u8) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    filled_mask(w, h, value)
        .save_with_format(path, image::ImageFormat::Png)
        .expect("write png mask");
}

/// Fill value of the mask stored at `path`.
pub fn mask_value(path: &Path) -> u8 {
    image::open(path).expect("open mask").into_luma8().get_pixel(0, 0)[0]
}

/// Sorted names of the `.png` files in `dir`.
pub fn png_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".png"))
        .collect();
    names.sort();
    names
}

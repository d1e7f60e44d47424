use std::io::Cursor;

use pinreel::{
    DiskFrameLoader, FrameIndex, ImageFormat, SequenceStore, load_blocking,
};

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "pinreel_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_png(path: &std::path::Path, shade: u8) {
    let img = image::RgbaImage::from_raw(2, 2, vec![shade; 16]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, &buf).unwrap();
}

#[test]
fn disk_loader_resolves_zero_padded_frames() {
    let tmp = temp_dir("disk_loader");
    std::fs::create_dir_all(tmp.join("seq")).unwrap();
    for i in 0..3u8 {
        write_png(&tmp.join("seq").join(format!("{i:04}.png")), i);
    }

    let mut store = SequenceStore::new();
    let tickets = store.begin_load("seq", 3, ImageFormat::Png).unwrap();
    let loader = DiskFrameLoader::new(&tmp);
    assert_eq!(load_blocking(&mut store, &tickets, &loader), 3);
    assert!(store.is_fully_loaded());

    let frame = store.resolve(FrameIndex(2)).unwrap();
    assert_eq!((frame.width, frame.height), (2, 2));
    assert_eq!(frame.rgba8_premul[0], 2);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_assets_are_skipped_without_failing_the_load() {
    let tmp = temp_dir("partial_sequence");
    std::fs::create_dir_all(tmp.join("seq")).unwrap();
    write_png(&tmp.join("seq").join("0000.png"), 7);
    // 0001.png is intentionally absent.
    write_png(&tmp.join("seq").join("0002.png"), 9);

    let mut store = SequenceStore::new();
    let tickets = store.begin_load("seq", 3, ImageFormat::Png).unwrap();
    let loader = DiskFrameLoader::new(&tmp);
    assert_eq!(load_blocking(&mut store, &tickets, &loader), 2);

    assert!(store.resolve(FrameIndex(0)).is_some());
    assert!(store.resolve(FrameIndex(1)).is_none());
    assert!(store.resolve(FrameIndex(2)).is_some());
    assert!(!store.is_fully_loaded());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn corrupt_assets_are_skipped_without_failing_the_load() {
    let tmp = temp_dir("corrupt_sequence");
    std::fs::create_dir_all(tmp.join("seq")).unwrap();
    write_png(&tmp.join("seq").join("0000.png"), 1);
    std::fs::write(tmp.join("seq").join("0001.png"), b"not a png").unwrap();

    let mut store = SequenceStore::new();
    let tickets = store.begin_load("seq", 2, ImageFormat::Png).unwrap();
    let loader = DiskFrameLoader::new(&tmp);
    assert_eq!(load_blocking(&mut store, &tickets, &loader), 1);
    assert!(store.resolve(FrameIndex(1)).is_none());

    std::fs::remove_dir_all(&tmp).ok();
}

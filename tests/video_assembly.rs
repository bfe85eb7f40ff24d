// End-to-end assembly checks. Encoding tests are skipped when ffmpeg is not
// installed; the geometry/timing failures they guard are covered by unit
// tests either way.

use std::path::Path;

use tldr_studio::assembler::{self, AssemblyOptions};
use tldr_studio::error::StageError;
use tldr_studio::stages::storyboard::pack_bundle;

fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn write_tone_wav(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for t in 0..(44100 * seconds) {
        let s = (t as f32 / 44100.0 * 330.0 * std::f32::consts::TAU).sin();
        writer.write_sample((s * 10000.0) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn write_scenes(dir: &Path, count: usize) -> Vec<std::path::PathBuf> {
    std::fs::create_dir_all(dir).unwrap();
    let mut paths = Vec::new();
    for i in 1..=count {
        let img = image::RgbaImage::from_pixel(640, 480, image::Rgba([30 * i as u8, 80, 120, 255]));
        let path = dir.join(format!("scene_{i:03}.png"));
        img.save(&path).unwrap();
        paths.push(path);
    }
    paths
}

#[tokio::test]
async fn test_empty_image_set_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let audio = tmp.path().join("narration.wav");
    write_tone_wav(&audio, 1);
    let scenes = tmp.path().join("scenes");
    std::fs::create_dir_all(&scenes).unwrap();
    let output = tmp.path().join("final_video.mp4");

    let err = assembler::assemble(&audio, &scenes, &output, &AssemblyOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StageError::InvalidInput(_)));
    assert!(!output.exists(), "no output artifact may be written");
}

#[tokio::test]
async fn test_assemble_from_scene_directory() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not installed; skipping encode test");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let audio = tmp.path().join("narration.wav");
    write_tone_wav(&audio, 2);
    let scenes = tmp.path().join("scenes");
    write_scenes(&scenes, 3);
    let output = tmp.path().join("final_video.mp4");

    let duration = assembler::assemble(&audio, &scenes, &output, &AssemblyOptions::default())
        .await
        .unwrap();

    // 3 scenes x 3s = 9s of video against 2s of narration: audio binds.
    assert!((duration - 2.0).abs() < 0.05, "got {duration}");
    assert!(output.exists());
    assert!(std::fs::metadata(&output).unwrap().len() > 0);

    // Scratch directories must be gone on the success path.
    let leftovers = std::fs::read_dir(tmp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_assemble_from_zip_bundle() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not installed; skipping encode test");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let audio = tmp.path().join("narration.wav");
    write_tone_wav(&audio, 9);
    let scene_paths = write_scenes(&tmp.path().join("scenes"), 2);
    let bundle = tmp.path().join("images.zip");
    std::fs::write(&bundle, pack_bundle(&scene_paths).unwrap()).unwrap();
    let output = tmp.path().join("final_video.mp4");

    let duration = assembler::assemble(&audio, &bundle, &output, &AssemblyOptions::default())
        .await
        .unwrap();

    // 2 scenes x 3s = 6s of video against 9s of narration: video binds.
    assert!((duration - 6.0).abs() < 0.05, "got {duration}");
    assert!(output.exists());
}

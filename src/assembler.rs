// TL;DR Studio - Media Assembler
//
// Composes an ordered storyboard image set and one narration track into the
// final fixed-framerate video. Geometry (scale/crop to the canonical frame)
// and timing (per-scene windows, truncation to the shorter medium) are
// computed deterministically in Rust; only the encode itself is delegated to
// ffmpeg, driven through a concat-demuxer manifest.

use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::StageError;
use crate::pipeline::process;

pub const FRAME_WIDTH: u32 = 1920;
pub const FRAME_HEIGHT: u32 = 1080;
pub const SCENE_SECONDS: f64 = 3.0;
pub const FRAME_RATE: u32 = 30;

/// Canonical frame and timing settings for one assembly.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub width: u32,
    pub height: u32,
    pub scene_seconds: f64,
    pub frame_rate: u32,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            scene_seconds: SCENE_SECONDS,
            frame_rate: FRAME_RATE,
        }
    }
}

/// One scene's display window against the audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneWindow {
    pub index: usize,
    pub start: f64,
    pub duration: f64,
}

/// Ephemeral per-assembly schedule. Derived, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub scenes: Vec<SceneWindow>,
    pub video_duration: f64,
    pub audio_duration: f64,
}

impl Timeline {
    /// Output length is the minimum of the two tracks; whichever runs out
    /// first cuts the other. Never padded.
    pub fn final_duration(&self) -> f64 {
        self.video_duration.min(self.audio_duration)
    }
}

/// Assign every image a fixed display window in encoded order.
pub fn build_timeline(
    image_count: usize,
    scene_seconds: f64,
    audio_duration: f64,
) -> Result<Timeline, StageError> {
    if image_count == 0 {
        return Err(StageError::InvalidInput(
            "no images to assemble".to_string(),
        ));
    }
    let scenes = (0..image_count)
        .map(|index| SceneWindow {
            index,
            start: index as f64 * scene_seconds,
            duration: scene_seconds,
        })
        .collect();
    Ok(Timeline {
        scenes,
        video_duration: image_count as f64 * scene_seconds,
        audio_duration,
    })
}

/// Normalize one still to the canonical frame: scale to the output height,
/// then center-crop horizontally if too wide, else stretch to the exact
/// width. The result is always exactly `width x height`, never letterboxed.
pub fn normalize_frame(img: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let scaled_w = ((w as f64 * height as f64 / h.max(1) as f64).round() as u32).max(1);
    let scaled = img.resize_exact(scaled_w, height, FilterType::Lanczos3);
    if scaled_w > width {
        let x = (scaled_w - width) / 2;
        scaled.crop_imm(x, 0, width, height).to_rgba8()
    } else if scaled_w < width {
        scaled.resize_exact(width, height, FilterType::Lanczos3).to_rgba8()
    } else {
        scaled.to_rgba8()
    }
}

/// ffmpeg concat-demuxer manifest with a display duration per entry. The
/// demuxer ignores the duration on the final entry, so the last frame is
/// listed a second time.
pub fn concat_manifest(frames: &[PathBuf], scene_seconds: f64) -> String {
    let mut out = String::new();
    for p in frames {
        out.push_str(&format!(
            "file '{}'\nduration {}\n",
            p.to_string_lossy(),
            scene_seconds
        ));
    }
    if let Some(last) = frames.last() {
        out.push_str(&format!("file '{}'\n", last.to_string_lossy()));
    }
    out
}

/// Decode the narration track far enough to learn its duration in seconds.
pub fn audio_duration_secs(path: &Path) -> Result<f64, StageError> {
    use symphonia::core::errors::Error as AudioError;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let file = fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| StageError::InvalidInput(format!("unreadable audio {path:?}: {e}")))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| StageError::InvalidInput("audio has no tracks".to_string()))?;
    let track_id = track.id;
    let time_base = track
        .codec_params
        .time_base
        .ok_or_else(|| StageError::InvalidInput("audio track has no time base".to_string()))?;

    if let Some(frames) = track.codec_params.n_frames {
        let t = time_base.calc_time(frames);
        return Ok(t.seconds as f64 + t.frac);
    }

    // Raw streams (bare mp3) carry no frame count up front: walk the packets.
    let mut end_ts = 0u64;
    loop {
        match format.next_packet() {
            Ok(p) if p.track_id() == track_id => end_ts = end_ts.max(p.ts() + p.dur()),
            Ok(_) => continue,
            Err(AudioError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(AudioError::ResetRequired) => break,
            Err(e) => {
                return Err(StageError::InvalidInput(format!(
                    "audio decode {path:?}: {e}"
                )))
            }
        }
    }
    let t = time_base.calc_time(end_ts);
    Ok(t.seconds as f64 + t.frac)
}

/// Scratch space for normalized frames and the concat manifest. Removed on
/// drop so success and failure paths both clean up.
struct ScratchDir(PathBuf);

impl ScratchDir {
    fn create(parent: &Path) -> Result<Self, StageError> {
        let dir = parent.join(format!("temp_{:08x}", rand::random::<u32>()));
        fs::create_dir_all(&dir)?;
        Ok(Self(dir))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.0) {
            warn!("[ASSEMBLE] scratch cleanup failed: {e}");
        }
    }
}

fn extract_archive(bundle: &Path, dest: &Path) -> Result<(), StageError> {
    let file = fs::File::open(bundle)?;
    let mut archive = zip::ZipArchive::new(file).map_err(std::io::Error::other)?;
    archive.extract(dest).map_err(std::io::Error::other)?;
    Ok(())
}

/// Numbered scene stills in a directory, in encoded (lexicographic) order.
fn ordered_scenes(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let mut stills: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map_or(false, |e| e == "png"))
        .collect();
    stills.sort();
    Ok(stills)
}

/// Compose `images` (a scene directory or a packaged `images.zip`) and the
/// narration at `audio` into `output`. Returns the final duration.
pub async fn assemble(
    audio: &Path,
    images: &Path,
    output: &Path,
    opts: &AssemblyOptions,
) -> Result<f64, StageError> {
    let parent = output.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let scratch = ScratchDir::create(parent)?;

    let scene_dir = if images.extension().map_or(false, |e| e == "zip") {
        let dir = scratch.path().join("scenes");
        extract_archive(images, &dir)?;
        dir
    } else {
        images.to_path_buf()
    };

    let stills = ordered_scenes(&scene_dir)?;
    if stills.is_empty() {
        return Err(StageError::InvalidInput(format!(
            "no scene images found in {scene_dir:?}"
        )));
    }

    let audio_duration = audio_duration_secs(audio)?;
    let timeline = build_timeline(stills.len(), opts.scene_seconds, audio_duration)?;
    info!(
        "[ASSEMBLE] {} scenes x {:.0}s, narration {:.2}s -> final {:.2}s",
        timeline.scenes.len(),
        opts.scene_seconds,
        audio_duration,
        timeline.final_duration()
    );

    let mut frames = Vec::with_capacity(stills.len());
    for (scene, still) in timeline.scenes.iter().zip(&stills) {
        let img = image::open(still)
            .map_err(|e| StageError::InvalidInput(format!("unreadable image {still:?}: {e}")))?;
        let frame = normalize_frame(&img, opts.width, opts.height);
        let frame_path = scratch.path().join(format!("frame_{:03}.png", scene.index + 1));
        frame.save(&frame_path).map_err(std::io::Error::other)?;
        frames.push(frame_path);
    }

    let manifest_path = scratch.path().join("scenes.txt");
    fs::write(&manifest_path, concat_manifest(&frames, opts.scene_seconds))?;

    encode(audio, &manifest_path, output, timeline.final_duration(), opts).await?;
    info!("[ASSEMBLE] wrote {:?}", output);
    Ok(timeline.final_duration())
}

/// Encode and mux the truncated tracks at the fixed frame rate.
async fn encode(
    audio: &Path,
    manifest: &Path,
    output: &Path,
    final_duration: f64,
    opts: &AssemblyOptions,
) -> Result<(), StageError> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-nostdin", "-f", "concat", "-safe", "0", "-i"])
        .arg(manifest)
        .arg("-i")
        .arg(audio)
        .args([
            "-r",
            &opts.frame_rate.to_string(),
            "-t",
            &format!("{final_duration:.3}"),
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            "aac",
        ])
        .arg(output);

    let captured = process::run_captured(cmd).await?;
    if captured.status != 0 {
        return Err(StageError::Process {
            status: captured.status,
            tail: captured.tail_text(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([200, 60, 60, 255])))
    }

    #[test]
    fn test_audio_is_the_binding_constraint() {
        // 5 images at 3s is a 15s track; 10s of narration cuts it to 10s.
        let timeline = build_timeline(5, 3.0, 10.0).unwrap();
        assert_eq!(timeline.video_duration, 15.0);
        assert_eq!(timeline.final_duration(), 10.0);
    }

    #[test]
    fn test_video_is_the_binding_constraint() {
        // 2 images at 3s is a 6s track; 20s of narration is cut to 6s.
        let timeline = build_timeline(2, 3.0, 20.0).unwrap();
        assert_eq!(timeline.video_duration, 6.0);
        assert_eq!(timeline.final_duration(), 6.0);
    }

    #[test]
    fn test_zero_duration_audio_is_well_formed() {
        let timeline = build_timeline(3, 3.0, 0.0).unwrap();
        assert_eq!(timeline.final_duration(), 0.0);
    }

    #[test]
    fn test_empty_image_set_is_invalid() {
        let err = build_timeline(0, 3.0, 10.0).unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
    }

    #[test]
    fn test_scene_windows_are_contiguous() {
        let timeline = build_timeline(4, 3.0, 30.0).unwrap();
        for (i, scene) in timeline.scenes.iter().enumerate() {
            assert_eq!(scene.index, i);
            assert_eq!(scene.start, i as f64 * 3.0);
            assert_eq!(scene.duration, 3.0);
        }
    }

    #[test]
    fn test_wide_image_is_center_cropped() {
        // 4000x1000 scales to 4320x1080, well past 1920 wide.
        let frame = normalize_frame(&solid(4000, 1000), 1920, 1080);
        assert_eq!(frame.dimensions(), (1920, 1080));
    }

    #[test]
    fn test_narrow_image_is_stretched() {
        // Square input scales to 1080x1080, then stretches to 1920 wide.
        let frame = normalize_frame(&solid(1024, 1024), 1920, 1080);
        assert_eq!(frame.dimensions(), (1920, 1080));
    }

    #[test]
    fn test_exact_aspect_passes_through() {
        let frame = normalize_frame(&solid(3840, 2160), 1920, 1080);
        assert_eq!(frame.dimensions(), (1920, 1080));
    }

    #[test]
    fn test_manifest_repeats_final_entry() {
        let frames = vec![
            PathBuf::from("/tmp/frame_001.png"),
            PathBuf::from("/tmp/frame_002.png"),
        ];
        let manifest = concat_manifest(&frames, 3.0);
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "file '/tmp/frame_001.png'");
        assert_eq!(lines[1], "duration 3");
        assert_eq!(lines[4], "file '/tmp/frame_002.png'");
    }

    #[test]
    fn test_wav_duration_probe() {
        let tmp = tempfile::tempdir().unwrap();
        let wav = tmp.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&wav, spec).unwrap();
        for t in 0..(44100 * 2) {
            let s = (t as f32 / 44100.0 * 440.0 * std::f32::consts::TAU).sin();
            writer.write_sample((s * 12000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let duration = audio_duration_secs(&wav).unwrap();
        assert!(
            (duration - 2.0).abs() < 0.05,
            "expected ~2.0s, got {duration}"
        );
    }
}

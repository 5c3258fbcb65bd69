use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use gaitwatch::config::Config;
use gaitwatch::detect::{
    Associator, BoundingBox, ClassedBox, EventDetector, FallClass, FallEvent, PersonBox,
};
use gaitwatch::gait::{self, MetricKind};
use gaitwatch::landmark::{Landmark, LandmarkFrame, LandmarkIndex};
use gaitwatch::range::personal_range;
use gaitwatch::report::{self, AnalysisReport, MetricHistory};

const CONFIG_PATH: &str = "config.toml";
const HISTORY_PATH: &str = "metric_history.json";

// --- 入力ストリームの形 ---

#[derive(Debug, Deserialize)]
struct LandmarkStream {
    fps: f64,
    frames: Vec<RawLandmarkFrame>,
}

#[derive(Debug, Deserialize)]
struct RawLandmarkFrame {
    frame: usize,
    /// ランドマーク名 -> [x, y, confidence]
    #[serde(default)]
    points: HashMap<String, [f64; 3]>,
}

#[derive(Debug, Deserialize)]
struct DetectionStream {
    fps: f64,
    frames: Vec<RawDetectionFrame>,
}

#[derive(Debug, Deserialize)]
struct RawDetectionFrame {
    frame: usize,
    /// 人体検出ボックス (単段構成では省略可)
    #[serde(default)]
    persons: Vec<RawBox>,
    /// 転倒分類ボックス
    #[serde(default)]
    boxes: Vec<RawClassedBox>,
}

#[derive(Debug, Deserialize)]
struct RawBox {
    bbox: [f64; 4],
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawClassedBox {
    bbox: [f64; 4],
    confidence: f64,
    class: String,
}

fn load_landmark_stream(path: &str) -> Result<(f64, Vec<LandmarkFrame>)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("ランドマークファイル {} を読み込めません", path))?;
    let stream: LandmarkStream = serde_json::from_str(&content)?;
    let frames = stream
        .frames
        .iter()
        .map(|raw| {
            let mut frame = LandmarkFrame::new(raw.frame);
            for (name, &[x, y, c]) in &raw.points {
                // 語彙にない点は欠測として扱う
                if let Some(index) = LandmarkIndex::from_name(name) {
                    frame.set(index, Landmark::new(x, y, c));
                }
            }
            frame
        })
        .collect();
    Ok((stream.fps, frames))
}

fn load_detection_stream(path: &str) -> Result<DetectionStream> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("検出ファイル {} を読み込めません", path))?;
    let stream: DetectionStream = serde_json::from_str(&content)?;
    Ok(stream)
}

/// 検出ストリームを間引きながらイベント列に集約する
fn detect_falls(stream: &DetectionStream, config: &Config) -> Vec<FallEvent> {
    let associator = Associator::new(config.detection.clone());
    let mut detector = EventDetector::new(&config.events, stream.fps);
    let skip = config.events.skip_frames.max(1);
    let mut last_frame = 0usize;
    for (i, raw) in stream.frames.iter().enumerate() {
        last_frame = raw.frame;
        if i % skip != 0 {
            continue;
        }
        let persons: Vec<PersonBox> = raw
            .persons
            .iter()
            .map(|b| PersonBox { bbox: BoundingBox::from_xyxy(b.bbox), confidence: b.confidence })
            .collect();
        let detections: Vec<ClassedBox> = raw
            .boxes
            .iter()
            .map(|b| ClassedBox {
                bbox: BoundingBox::from_xyxy(b.bbox),
                confidence: b.confidence,
                class: FallClass::from_label(&b.class),
            })
            .collect();
        let outcome = associator.process_frame(&persons, &detections);
        detector.step(raw.frame, outcome.aggregate.fall_detected, outcome.aggregate.confidence);
    }
    detector.finish(last_frame)
}

fn report_path_for(input: &str) -> String {
    let path = Path::new(input);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("analysis");
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            dir.join(format!("{}_report.json", stem)).to_string_lossy().into_owned()
        }
        _ => format!("{}_report.json", stem),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("使い方: {} <landmarks.json> [detections.json]", args[0]);
    }
    let landmark_path = &args[1];
    let detection_path = args.get(2);

    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== GaitWatch 歩行解析 ===");
    println!();

    let (fps, frames) = load_landmark_stream(landmark_path)?;
    let complete = frames
        .iter()
        .filter(|f| f.is_complete(config.analysis.landmark_confidence))
        .count();
    println!(
        "[1/4] ランドマーク読み込み: {} フレーム ({:.1} fps, 完全フレーム {}/{})",
        frames.len(),
        fps,
        complete,
        frames.len()
    );

    let analysis = gait::analyze(&frames, &config.analysis, fps);
    if analysis.has_valid_gait {
        println!("[2/4] 歩行解析完了");
    } else {
        println!("[2/4] 有効な歩行周期が検出できませんでした");
    }

    let fall_events = match detection_path {
        Some(path) => {
            let stream = load_detection_stream(path)?;
            let events = detect_falls(&stream, &config);
            println!("[3/4] 転倒検出: {} 件", events.len());
            events
        }
        None => {
            println!("[3/4] 検出ストリームなし、転倒検出をスキップ");
            Vec::new()
        }
    };

    let report = AnalysisReport::build(&analysis, fall_events);

    println!();
    println!("指標:");
    for row in &report.rows {
        match row.value {
            Some(v) => println!("  {}: {} {}", row.label, v, row.unit),
            None => println!("  {}: 未計測", row.label),
        }
    }
    if let Some(warning) = &report.warning {
        println!();
        println!("{}", warning);
    }

    let report_path = report_path_for(landmark_path);
    report::save_report(&report_path, &report)?;
    println!();
    println!("[4/4] レポートを書き出しました: {}", report_path);

    // 履歴に追記して個人基準範囲を更新
    let mut history = if Path::new(HISTORY_PATH).exists() {
        report::load_history(HISTORY_PATH)?
    } else {
        MetricHistory::default()
    };
    history.push(&report.metrics);
    report::save_history(HISTORY_PATH, &history)?;

    println!();
    println!("基準範囲 (履歴 {} 回分):", history.len());
    for kind in MetricKind::ALL {
        let values = history.values(kind);
        let range = personal_range(
            &values,
            kind.baseline(),
            kind.hard_bounds(),
            kind.direction(),
            &config.ranges,
        );
        let source = if range.personalized { "個人" } else { "標準" };
        println!(
            "  {}: {:.2} ~ {:.2} {} ({})",
            kind.label(),
            range.min,
            range.max,
            kind.unit(),
            source
        );
    }

    Ok(())
}

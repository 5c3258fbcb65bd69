pub mod cycles;
pub mod metrics;
pub mod signal;
pub mod trajectory;

pub use cycles::{CycleEvent, GaitCycles, SideCycles};
pub use metrics::{round_to, GaitMetrics, MetricKind};
pub use trajectory::{BodySignals, Trajectory};

use crate::config::AnalysisConfig;
use crate::landmark::LandmarkFrame;

/// 1 本の映像に対する歩行解析の結果一式
#[derive(Debug, Clone)]
pub struct GaitAnalysis {
    pub fps: f64,
    pub frame_count: usize,
    pub has_valid_gait: bool,
    /// 最初の完全な歩行周期が始まるフレーム
    pub first_cycle_frame: Option<usize>,
    pub metrics: GaitMetrics,
    pub cycles: GaitCycles,
}

/// ランドマーク列から歩行指標一式を計算する
///
/// データ不足は個々の指標が None になるだけで、失敗にはしない
pub fn analyze(frames: &[LandmarkFrame], config: &AnalysisConfig, fps: f64) -> GaitAnalysis {
    let signals = BodySignals::build(frames, config.landmark_confidence);
    let cycles = GaitCycles::detect(&signals, config, fps);
    let metrics = GaitMetrics::compute(&signals, &cycles);
    GaitAnalysis {
        fps,
        frame_count: frames.len(),
        has_valid_gait: cycles.has_valid_gait(),
        first_cycle_frame: cycles.first_cycle_frame(),
        metrics,
        cycles,
    }
}

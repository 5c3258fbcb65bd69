use crate::config::AnalysisConfig;
use crate::landmark::Side;

use super::signal::{self, find_peaks, rolling_mean, savgol_filter};
use super::trajectory::{BodySignals, Trajectory};

/// 接地イベント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleEvent {
    /// 元映像のフレーム番号
    pub frame: usize,
    pub side: Side,
    /// 接地時刻 (秒)
    pub time: f64,
}

/// 片脚分の接地イベントと歩行周期
#[derive(Debug, Clone, Default)]
pub struct SideCycles {
    /// 接地イベント (フレーム昇順)
    pub events: Vec<CycleEvent>,
    /// 連続する接地の間隔 (秒)
    pub durations: Vec<f64>,
}

impl SideCycles {
    /// 足首 Y 座標の平滑化→去トレンド→ピーク検出で接地を拾う
    ///
    /// 歩行中は足が着地した瞬間に足首の Y 座標 (画面下向き) が
    /// 極大になることを利用する
    fn detect(ankle_y: Option<&Trajectory>, side: Side, config: &AnalysisConfig, fps: f64) -> Self {
        let Some(trajectory) = ankle_y else {
            return Self::default();
        };
        let smoothed = savgol_filter(&trajectory.values, config.smooth_window);
        let trend = rolling_mean(&smoothed, config.detrend_window);
        let detrended = &smoothed - &trend;
        let frames = find_peaks(&detrended, config.peak_prominence, config.peak_distance);
        let durations = if fps > 0.0 {
            frames
                .windows(2)
                .map(|pair| (pair[1] - pair[0]) as f64 / fps)
                .collect()
        } else {
            Vec::new()
        };
        let events = frames
            .into_iter()
            .map(|frame| CycleEvent {
                frame,
                side,
                time: if fps > 0.0 { frame as f64 / fps } else { 0.0 },
            })
            .collect();
        Self { events, durations }
    }

    pub fn mean_duration(&self) -> Option<f64> {
        (!self.durations.is_empty()).then(|| signal::mean(&self.durations))
    }
}

/// 両脚分の歩行周期検出結果
#[derive(Debug, Clone, Default)]
pub struct GaitCycles {
    pub left: SideCycles,
    pub right: SideCycles,
    /// 歩数率 (歩/分)。接地ゼロなら 0
    pub cadence: f64,
}

impl GaitCycles {
    pub fn detect(signals: &BodySignals, config: &AnalysisConfig, fps: f64) -> Self {
        let left = SideCycles::detect(signals.ankle_y(Side::Left), Side::Left, config, fps);
        let right = SideCycles::detect(signals.ankle_y(Side::Right), Side::Right, config, fps);
        let total_steps = (left.events.len() + right.events.len()) as f64;
        let total_time = if fps > 0.0 {
            signals.frame_count as f64 / fps
        } else {
            0.0
        };
        let cadence = if total_time > 0.0 {
            total_steps / total_time * 60.0
        } else {
            0.0
        };
        Self { left, right, cadence }
    }

    /// いずれかの脚で接地が 2 回以上取れていれば歩行とみなす
    pub fn has_valid_gait(&self) -> bool {
        self.left.events.len() >= 2 || self.right.events.len() >= 2
    }

    /// 最初の完全な歩行周期の開始フレーム (右脚優先)
    pub fn first_cycle_frame(&self) -> Option<usize> {
        self.right
            .events
            .get(1)
            .or_else(|| self.left.events.get(1))
            .map(|e| e.frame)
    }

    /// 両脚の接地イベントをフレーム順に並べる (同フレームは左が先)
    pub fn pooled_events(&self) -> Vec<CycleEvent> {
        let mut events: Vec<CycleEvent> = self
            .left
            .events
            .iter()
            .chain(self.right.events.iter())
            .copied()
            .collect();
        events.sort_by_key(|e| e.frame);
        events
    }

    /// 左右の周期を合わせたもの (ばらつき指標用)
    pub fn pooled_durations(&self) -> Vec<f64> {
        let mut pooled = self.right.durations.clone();
        pooled.extend_from_slice(&self.left.durations);
        pooled
    }
}

use serde::{Deserialize, Serialize};

use crate::landmark::Side;
use crate::range::{BaselineRange, Direction, HardBounds};

use super::cycles::{CycleEvent, GaitCycles};
use super::signal;
use super::trajectory::{BodySignals, Trajectory};

/// 報告対象の歩行指標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// 歩行率 (歩/分)
    Cadence,
    /// 歩行周期 (秒)
    CycleTime,
    /// 左右周期の対称性指数 (%)
    SymmetryIndex,
    /// 周期の変動係数 (%)
    VariabilityCv,
    /// 体幹傾斜角のフレーム間変化 (度/フレーム)
    TorsoStability,
    /// 平均体幹傾斜角 (度)
    TorsoTilt,
    /// 平均歩幅 (正規化座標)
    StepLength,
    /// 足の振り幅 (正規化座標)
    SwingAmplitude,
    /// 膝関節可動域 (度)
    KneeRom,
}

impl MetricKind {
    pub const ALL: [MetricKind; 9] = [
        MetricKind::Cadence,
        MetricKind::CycleTime,
        MetricKind::SymmetryIndex,
        MetricKind::VariabilityCv,
        MetricKind::TorsoStability,
        MetricKind::TorsoTilt,
        MetricKind::StepLength,
        MetricKind::SwingAmplitude,
        MetricKind::KneeRom,
    ];

    /// レポートや履歴で使う識別子
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::Cadence => "cadence",
            MetricKind::CycleTime => "cycle_time",
            MetricKind::SymmetryIndex => "symmetry_index",
            MetricKind::VariabilityCv => "variability_cv",
            MetricKind::TorsoStability => "torso_stability",
            MetricKind::TorsoTilt => "torso_tilt",
            MetricKind::StepLength => "step_length",
            MetricKind::SwingAmplitude => "swing_amplitude",
            MetricKind::KneeRom => "knee_rom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MetricKind::ALL.into_iter().find(|k| k.name() == name)
    }

    /// 表示名
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Cadence => "歩行率",
            MetricKind::CycleTime => "歩行周期",
            MetricKind::SymmetryIndex => "対称性指数",
            MetricKind::VariabilityCv => "変動係数",
            MetricKind::TorsoStability => "体幹安定性",
            MetricKind::TorsoTilt => "体幹傾斜角",
            MetricKind::StepLength => "平均歩幅",
            MetricKind::SwingAmplitude => "足の振り幅",
            MetricKind::KneeRom => "膝関節可動域",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Cadence => "歩/分",
            MetricKind::CycleTime => "秒",
            MetricKind::SymmetryIndex => "%",
            MetricKind::VariabilityCv => "%",
            MetricKind::TorsoStability => "度/フレーム",
            MetricKind::TorsoTilt => "度",
            MetricKind::StepLength => "相対値",
            MetricKind::SwingAmplitude => "相対値",
            MetricKind::KneeRom => "度",
        }
    }

    /// 報告時の小数点以下桁数
    pub fn decimals(self) -> u32 {
        match self {
            MetricKind::Cadence => 1,
            MetricKind::CycleTime => 3,
            MetricKind::SymmetryIndex => 1,
            MetricKind::VariabilityCv => 1,
            MetricKind::TorsoStability => 3,
            MetricKind::TorsoTilt => 1,
            MetricKind::StepLength => 4,
            MetricKind::SwingAmplitude => 4,
            MetricKind::KneeRom => 1,
        }
    }

    /// 値の解釈方向。ばらつき系は小さいほど良い
    pub fn direction(self) -> Direction {
        match self {
            MetricKind::SymmetryIndex | MetricKind::VariabilityCv | MetricKind::TorsoStability => {
                Direction::LowerIsBetter
            }
            _ => Direction::Nominal,
        }
    }

    /// 健常歩行の集団基準範囲
    pub fn baseline(self) -> BaselineRange {
        match self {
            MetricKind::Cadence => BaselineRange::new(90.0, 130.0),
            MetricKind::CycleTime => BaselineRange::new(0.8, 1.5),
            MetricKind::SymmetryIndex => BaselineRange::new(0.0, 10.0),
            MetricKind::VariabilityCv => BaselineRange::new(0.0, 8.0),
            MetricKind::TorsoStability => BaselineRange::new(0.0, 2.0),
            MetricKind::TorsoTilt => BaselineRange::new(0.0, 15.0),
            MetricKind::StepLength => BaselineRange::new(0.05, 0.25),
            MetricKind::SwingAmplitude => BaselineRange::new(0.02, 0.2),
            MetricKind::KneeRom => BaselineRange::new(30.0, 80.0),
        }
    }

    /// 物理的にあり得る値の範囲。外れる測定値は履歴から除外する
    pub fn hard_bounds(self) -> HardBounds {
        match self {
            MetricKind::Cadence => HardBounds::new(30.0, 200.0),
            MetricKind::CycleTime => HardBounds::new(0.2, 5.0),
            MetricKind::SymmetryIndex => HardBounds::new(0.0, 100.0),
            MetricKind::VariabilityCv => HardBounds::new(0.0, 100.0),
            MetricKind::TorsoStability => HardBounds::new(0.0, 45.0),
            MetricKind::TorsoTilt => HardBounds::new(0.0, 90.0),
            MetricKind::StepLength => HardBounds::new(0.0, 1.0),
            MetricKind::SwingAmplitude => HardBounds::new(0.0, 1.0),
            MetricKind::KneeRom => HardBounds::new(0.0, 180.0),
        }
    }
}

/// 1 回の解析で得られる指標一式
///
/// 計算に必要なデータが足りない指標は None のまま報告する
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GaitMetrics {
    pub cadence: Option<f64>,
    pub cycle_time: Option<f64>,
    pub symmetry_index: Option<f64>,
    pub variability_cv: Option<f64>,
    pub torso_stability: Option<f64>,
    pub torso_tilt: Option<f64>,
    pub step_length: Option<f64>,
    pub swing_amplitude: Option<f64>,
    pub left_swing: Option<f64>,
    pub right_swing: Option<f64>,
    pub knee_rom: Option<f64>,
}

impl GaitMetrics {
    /// 歩行周期が取れていない場合は全指標を None にする
    pub fn compute(signals: &BodySignals, cycles: &GaitCycles) -> Self {
        if !cycles.has_valid_gait() {
            return Self::default();
        }

        let cadence = Some(round_to(cycles.cadence, 1));

        let mean_left = cycles.left.mean_duration();
        let mean_right = cycles.right.mean_duration();
        let (cycle_time, symmetry_index) = match (mean_left, mean_right) {
            (Some(l), Some(r)) => {
                let avg = (l + r) / 2.0;
                let si = if avg > 0.0 { (r - l).abs() / avg * 100.0 } else { 0.0 };
                (Some(round_to(avg, 3)), Some(round_to(si, 1)))
            }
            _ => (None, None),
        };

        let pooled = cycles.pooled_durations();
        let variability_cv = (pooled.len() > 1).then(|| {
            let mean = signal::mean(&pooled);
            let cv = if mean > 0.0 {
                signal::std_population(&pooled) / mean * 100.0
            } else {
                0.0
            };
            round_to(cv, 1)
        });

        let (torso_stability, torso_tilt) = torso_metrics(signals.torso_tilt.as_ref());

        let steps = step_lengths(signals, cycles);
        let step_length = (!steps.is_empty()).then(|| round_to(signal::mean(&steps), 4));

        let left_span = value_span(signals.ankle_y(Side::Left));
        let right_span = value_span(signals.ankle_y(Side::Right));
        let swing_amplitude = match (left_span, right_span) {
            (Some(l), Some(r)) => {
                let mean_swing = (l + r) / 2.0;
                (mean_swing > 0.0).then(|| round_to(mean_swing, 4))
            }
            _ => None,
        };

        let knee_rom = match (
            value_span(signals.knee_angle(Side::Left)),
            value_span(signals.knee_angle(Side::Right)),
        ) {
            (Some(l), Some(r)) => Some(round_to((l + r) / 2.0, 1)),
            _ => None,
        };

        Self {
            cadence,
            cycle_time,
            symmetry_index,
            variability_cv,
            torso_stability,
            torso_tilt,
            step_length,
            swing_amplitude,
            left_swing: left_span.map(|v| round_to(v, 4)),
            right_swing: right_span.map(|v| round_to(v, 4)),
            knee_rom,
        }
    }

    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        match kind {
            MetricKind::Cadence => self.cadence,
            MetricKind::CycleTime => self.cycle_time,
            MetricKind::SymmetryIndex => self.symmetry_index,
            MetricKind::VariabilityCv => self.variability_cv,
            MetricKind::TorsoStability => self.torso_stability,
            MetricKind::TorsoTilt => self.torso_tilt,
            MetricKind::StepLength => self.step_length,
            MetricKind::SwingAmplitude => self.swing_amplitude,
            MetricKind::KneeRom => self.knee_rom,
        }
    }
}

/// 体幹の安定性 (フレーム間変化の平均) と平均傾斜角
///
/// 変化を取るには 2 フレーム以上必要
fn torso_metrics(tilt: Option<&Trajectory>) -> (Option<f64>, Option<f64>) {
    let Some(t) = tilt else {
        return (None, None);
    };
    if t.len() < 2 {
        return (None, None);
    }
    let v = &t.values;
    let mut changes = Vec::with_capacity(v.len() - 1);
    for i in 1..v.len() {
        changes.push((v[i] - v[i - 1]).abs());
    }
    let stability = round_to(signal::mean(&changes), 3);
    let mean_angle = round_to(v.mean().unwrap_or(0.0), 1);
    (Some(stability), Some(mean_angle))
}

/// 接地イベントごとの着地位置の水平移動量
///
/// 連続する接地の間で、それぞれの脚の足首 X 座標の差を取る。
/// ごく小さい値はノイズとして捨てる
fn step_lengths(signals: &BodySignals, cycles: &GaitCycles) -> Vec<f64> {
    let events = cycles.pooled_events();
    let mut lengths = Vec::new();
    for pair in events.windows(2) {
        let Some(prev_x) = ankle_x_at(signals, pair[0]) else {
            continue;
        };
        let Some(cur_x) = ankle_x_at(signals, pair[1]) else {
            continue;
        };
        let step = (cur_x - prev_x).abs();
        if step > 0.001 {
            lengths.push(step);
        }
    }
    lengths
}

fn ankle_x_at(signals: &BodySignals, event: CycleEvent) -> Option<f64> {
    let t = signals.ankle_x(event.side)?;
    (event.frame < t.len()).then(|| t.values[event.frame])
}

/// 系列の最大値と最小値の差
fn value_span(t: Option<&Trajectory>) -> Option<f64> {
    let t = t?;
    if t.is_empty() {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in t.values.iter() {
        min = min.min(v);
        max = max.max(v);
    }
    Some(max - min)
}

/// 小数第 `decimals` 位に四捨五入する (ちょうど半分は 0 から遠い方へ)
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::gait::cycles::SideCycles;
    use crate::landmark::{Landmark, LandmarkFrame, LandmarkIndex};
    use ndarray::Array1;

    fn make_walking_frames(count: usize) -> Vec<LandmarkFrame> {
        (0..count)
            .map(|i| {
                let mut frame = LandmarkFrame::new(i);
                let phase = 2.0 * std::f64::consts::PI * i as f64 / 30.0;
                let y = 0.5 + 0.05 * phase.sin();
                frame.set(LandmarkIndex::LeftAnkle, Landmark::new(0.4, y, 0.9));
                frame.set(LandmarkIndex::RightAnkle, Landmark::new(0.6, y, 0.9));
                frame
            })
            .collect()
    }

    fn side_events(frames: Vec<usize>, side: Side) -> Vec<CycleEvent> {
        frames
            .into_iter()
            .map(|frame| CycleEvent { frame, side, time: frame as f64 / 30.0 })
            .collect()
    }

    fn make_cycles(left: (Vec<usize>, Vec<f64>), right: (Vec<usize>, Vec<f64>)) -> GaitCycles {
        GaitCycles {
            left: SideCycles { events: side_events(left.0, Side::Left), durations: left.1 },
            right: SideCycles { events: side_events(right.0, Side::Right), durations: right.1 },
            cadence: 100.0,
        }
    }

    #[test]
    fn test_compute_from_synthetic_walk() {
        let frames = make_walking_frames(300);
        let signals = BodySignals::build(&frames, 0.3);
        let cycles = GaitCycles::detect(&signals, &AnalysisConfig::default(), 30.0);
        let metrics = GaitMetrics::compute(&signals, &cycles);

        assert_eq!(metrics.cadence, Some(120.0));
        let cycle_time = metrics.cycle_time.unwrap();
        assert!((0.95..=1.05).contains(&cycle_time), "cycle_time = {}", cycle_time);
        // 左右同一の信号なので対称性はほぼ完全
        assert!(metrics.symmetry_index.unwrap() < 5.0);
        // 振幅 0.05 の正弦波の振り幅は約 0.1
        let swing = metrics.swing_amplitude.unwrap();
        assert!((0.09..=0.11).contains(&swing), "swing = {}", swing);
        // 接地のたびに足首 X の差 0.2 が歩幅になる
        let step = metrics.step_length.unwrap();
        assert!((step - 0.2).abs() < 1e-9, "step = {}", step);
        // 膝と体幹のランドマークは観測していない
        assert_eq!(metrics.knee_rom, None);
        assert_eq!(metrics.torso_stability, None);
    }

    #[test]
    fn test_no_gait_means_no_metrics() {
        let frames = make_walking_frames(300);
        let signals = BodySignals::build(&frames, 0.3);
        let cycles = GaitCycles::default();
        let metrics = GaitMetrics::compute(&signals, &cycles);
        assert_eq!(metrics.cadence, None);
        assert_eq!(metrics.swing_amplitude, None);
        assert_eq!(metrics.step_length, None);
    }

    #[test]
    fn test_cycle_symmetry_and_cv() {
        let signals = BodySignals::build(&[], 0.3);
        let cycles = make_cycles((vec![0, 30], vec![1.0]), (vec![15, 51], vec![1.2]));
        let metrics = GaitMetrics::compute(&signals, &cycles);

        assert_eq!(metrics.cadence, Some(100.0));
        assert_eq!(metrics.cycle_time, Some(1.1));
        // |1.2 - 1.0| / 1.1 * 100 = 18.18...
        assert_eq!(metrics.symmetry_index, Some(18.2));
        // 母標準偏差 0.1 / 平均 1.1 * 100 = 9.09...
        assert_eq!(metrics.variability_cv, Some(9.1));
    }

    #[test]
    fn test_identical_cycles_have_zero_spread() {
        let signals = BodySignals::build(&[], 0.3);
        let cycles = make_cycles((vec![0, 30], vec![1.0]), (vec![15, 45], vec![1.0]));
        let metrics = GaitMetrics::compute(&signals, &cycles);
        assert_eq!(metrics.symmetry_index, Some(0.0));
        assert_eq!(metrics.variability_cv, Some(0.0));
    }

    #[test]
    fn test_single_duration_has_no_cv() {
        let signals = BodySignals::build(&[], 0.3);
        let cycles = make_cycles((vec![0, 30], vec![1.0]), (vec![], vec![]));
        let metrics = GaitMetrics::compute(&signals, &cycles);
        assert_eq!(metrics.variability_cv, None);
        // 片脚しか周期が無いので平均周期も出せない
        assert_eq!(metrics.cycle_time, None);
    }

    #[test]
    fn test_torso_metrics_constant_tilt() {
        let mut signals = BodySignals::build(&[], 0.3);
        signals.torso_tilt = Some(Trajectory::from_values(Array1::from(vec![10.0; 5])));
        let cycles = make_cycles((vec![0, 30], vec![1.0]), (vec![], vec![]));
        let metrics = GaitMetrics::compute(&signals, &cycles);
        // 一定の傾きなら安定性 (変化量) は 0 で、角度はそのまま
        assert_eq!(metrics.torso_stability, Some(0.0));
        assert_eq!(metrics.torso_tilt, Some(10.0));
    }

    #[test]
    fn test_torso_needs_two_frames() {
        let mut signals = BodySignals::build(&[], 0.3);
        signals.torso_tilt = Some(Trajectory::from_values(Array1::from(vec![10.0])));
        let cycles = make_cycles((vec![0, 30], vec![1.0]), (vec![], vec![]));
        let metrics = GaitMetrics::compute(&signals, &cycles);
        assert_eq!(metrics.torso_stability, None);
        assert_eq!(metrics.torso_tilt, None);
    }

    #[test]
    fn test_knee_rom_needs_both_legs() {
        let mut signals = BodySignals::build(&[], 0.3);
        signals.left_knee_angle =
            Some(Trajectory::from_values(Array1::from(vec![170.0, 175.0, 180.0])));
        let cycles = make_cycles((vec![0, 30], vec![1.0]), (vec![], vec![]));
        let metrics = GaitMetrics::compute(&signals, &cycles);
        assert_eq!(metrics.knee_rom, None);

        signals.right_knee_angle = Some(Trajectory::from_values(Array1::from(vec![160.0, 180.0])));
        let metrics = GaitMetrics::compute(&signals, &cycles);
        // (10 + 20) / 2
        assert_eq!(metrics.knee_rom, Some(15.0));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(18.1818, 1), 18.2);
        assert_eq!(round_to(1.25, 1), 1.3);
        assert_eq!(round_to(-1.25, 1), -1.3);
        assert_eq!(round_to(0.20004, 4), 0.2);
    }

    #[test]
    fn test_metric_catalog() {
        assert_eq!(MetricKind::ALL.len(), 9);
        for kind in MetricKind::ALL {
            assert_eq!(MetricKind::from_name(kind.name()), Some(kind));
            let b = kind.baseline();
            let h = kind.hard_bounds();
            assert!(b.min < b.max, "{} baseline", kind.name());
            assert!(h.min <= b.min && b.max <= h.max, "{} bounds", kind.name());
        }
        assert_eq!(MetricKind::Cadence.decimals(), 1);
        assert_eq!(MetricKind::StepLength.decimals(), 4);
        assert_eq!(MetricKind::VariabilityCv.direction(), Direction::LowerIsBetter);
    }
}

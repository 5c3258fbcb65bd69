use crate::config::RangeConfig;
use crate::gait::round_to;
use crate::gait::signal;

/// 指標の解釈方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// 範囲の中に収まるのが望ましい
    Nominal,
    /// 小さいほど良い (範囲の下限は 0 で打ち切る)
    LowerIsBetter,
}

/// 集団由来の基準範囲
#[derive(Debug, Clone, Copy)]
pub struct BaselineRange {
    pub min: f64,
    pub max: f64,
}

impl BaselineRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// 物理的にあり得る値の範囲。外れる測定値は履歴から捨てる
#[derive(Debug, Clone, Copy)]
pub struct HardBounds {
    pub min: f64,
    pub max: f64,
}

impl HardBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// 個人基準範囲とその根拠となる統計量
///
/// 履歴から毎回計算し直すもので、保存はしない
#[derive(Debug, Clone)]
pub struct ReferenceRange {
    pub min: f64,
    pub max: f64,
    /// フィルタ後に残った測定値の数
    pub sample_count: usize,
    /// 物理範囲外として除外した数
    pub hard_bound_outliers: usize,
    /// IQR 外れ値として除外した数
    pub iqr_outliers: usize,
    /// 履歴から個人化できたか (サンプル不足なら基準値のまま)
    pub personalized: bool,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub observed_min: Option<f64>,
    pub observed_max: Option<f64>,
}

/// 履歴の測定値から個人基準範囲を推定する
///
/// 外れ値を 2 段階 (物理範囲→IQR) で除外し、残りが十分にあれば
/// 平均 ± 1.5σ の個人範囲を集団基準値と 7:3 で混合する。
/// サンプルが少ないうちは集団基準値をそのまま返す
pub fn personal_range(
    values: &[f64],
    baseline: BaselineRange,
    bounds: HardBounds,
    direction: Direction,
    config: &RangeConfig,
) -> ReferenceRange {
    let in_bounds: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| bounds.contains(*v))
        .collect();
    let hard_bound_outliers = values.len() - in_bounds.len();

    let (kept, iqr_outliers) = if in_bounds.len() >= config.min_iqr_samples {
        filter_iqr(in_bounds, config.iqr_multiplier)
    } else {
        (in_bounds, 0)
    };

    let observed_min = kept.iter().copied().reduce(f64::min);
    let observed_max = kept.iter().copied().reduce(f64::max);
    let mean = (!kept.is_empty()).then(|| signal::mean(&kept));
    let std = (!kept.is_empty()).then(|| signal::std_population(&kept));

    if kept.len() < config.min_samples {
        return ReferenceRange {
            min: baseline.min,
            max: baseline.max,
            sample_count: kept.len(),
            hard_bound_outliers,
            iqr_outliers,
            personalized: false,
            mean,
            std,
            observed_min,
            observed_max,
        };
    }

    let m = mean.unwrap_or(0.0);
    // 揃いすぎた少数サンプルで範囲が潰れないよう下限を設ける
    let floor = if m == 0.0 {
        1.0
    } else {
        config.std_floor_ratio * m.abs()
    };
    let sigma = std.unwrap_or(0.0).max(floor);

    let mut personal_min = m - config.std_multiplier * sigma;
    let personal_max = m + config.std_multiplier * sigma;
    if direction == Direction::LowerIsBetter {
        personal_min = personal_min.max(0.0);
    }

    let mut min = config.personal_weight * personal_min + config.baseline_weight * baseline.min;
    let mut max = config.personal_weight * personal_max + config.baseline_weight * baseline.max;
    if direction == Direction::LowerIsBetter {
        min = min.max(0.0);
    }

    ReferenceRange {
        min: round_to(min, 2),
        max: round_to(max, 2),
        sample_count: kept.len(),
        hard_bound_outliers,
        iqr_outliers,
        personalized: true,
        mean,
        std,
        observed_min,
        observed_max,
    }
}

/// 四分位範囲の 1.5 倍則で外れ値を除外する
fn filter_iqr(values: Vec<f64>, multiplier: f64) -> (Vec<f64>, usize) {
    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let lo = q1 - multiplier * iqr;
    let hi = q3 + multiplier * iqr;
    let total = values.len();
    let kept: Vec<f64> = values.into_iter().filter(|v| lo <= *v && *v <= hi).collect();
    let removed = total - kept.len();
    (kept, removed)
}

/// 線形補間による分位点。入力はソート済みであること
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

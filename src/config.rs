use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub ranges: RangeConfig,
}

/// 歩行解析 (軌跡・周期検出) のパラメータ
#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// ランドマーク受け入れ閾値 (これを超えた信頼度のみ採用)
    #[serde(default = "default_landmark_confidence")]
    pub landmark_confidence: f64,
    /// Savitzky-Golay 平滑化の窓長 (奇数)
    #[serde(default = "default_smooth_window")]
    pub smooth_window: usize,
    /// 移動平均による去トレンドの窓長 (サンプル数)
    #[serde(default = "default_detrend_window")]
    pub detrend_window: usize,
    /// ピーク検出の最小 prominence (正規化座標)
    #[serde(default = "default_peak_prominence")]
    pub peak_prominence: f64,
    /// ピーク同士の最小間隔 (フレーム数)
    #[serde(default = "default_peak_distance")]
    pub peak_distance: usize,
}

/// 検出ボックス関連付けのパラメータ
#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// 人体検出の信頼度閾値
    #[serde(default = "default_person_confidence")]
    pub person_confidence: f64,
    /// 転倒/正常分類の信頼度閾値 (誤報抑制のため高め)
    #[serde(default = "default_fall_confidence")]
    pub fall_confidence: f64,
    /// 単段モードで使う信頼度閾値
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// IoU マッチング閾値 (これを超えた重なりのみ関連付け)
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f64,
    /// 二段検出 (人体ゲート付き) を使うか
    #[serde(default = "default_two_stage")]
    pub two_stage: bool,
}

/// 転倒イベント状態機械のパラメータ
#[derive(Debug, Deserialize, Clone)]
pub struct EventConfig {
    /// 多数決窓の時間幅 (秒)
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    /// 窓内の転倒票がこの比率以上なら転倒とみなす
    #[serde(default = "default_vote_threshold")]
    pub vote_threshold: f64,
    /// イベントの最小持続時間 (秒)
    #[serde(default = "default_min_duration_seconds")]
    pub min_duration_seconds: f64,
    /// イベント間のクールダウン時間 (秒)
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: f64,
    /// 検出側のサンプリング間隔 (フレーム)
    #[serde(default = "default_skip_frames")]
    pub skip_frames: usize,
}

/// 個人基準範囲エンジンのパラメータ
#[derive(Debug, Deserialize, Clone)]
pub struct RangeConfig {
    /// 個人推定の重み (基準値とのブレンド)
    #[serde(default = "default_personal_weight")]
    pub personal_weight: f64,
    /// 集団基準値の重み
    #[serde(default = "default_baseline_weight")]
    pub baseline_weight: f64,
    /// IQR 外れ値判定の倍率
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,
    /// 個人範囲の幅 (平均 ± 倍率×標準偏差)
    #[serde(default = "default_std_multiplier")]
    pub std_multiplier: f64,
    /// 標準偏差の下限 (|平均| に対する比率)
    #[serde(default = "default_std_floor_ratio")]
    pub std_floor_ratio: f64,
    /// 個人範囲を使う最小サンプル数 (未満は基準値のまま)
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// IQR フィルタを適用する最小サンプル数
    #[serde(default = "default_min_iqr_samples")]
    pub min_iqr_samples: usize,
}

fn default_landmark_confidence() -> f64 { 0.3 }
fn default_smooth_window() -> usize { 11 }
fn default_detrend_window() -> usize { 30 }
fn default_peak_prominence() -> f64 { 0.005 }
fn default_peak_distance() -> usize { 10 }

fn default_person_confidence() -> f64 { 0.5 }
fn default_fall_confidence() -> f64 { 0.6 }
fn default_confidence_threshold() -> f64 { 0.5 }
fn default_iou_threshold() -> f64 { 0.3 }
fn default_two_stage() -> bool { true }

fn default_window_seconds() -> f64 { 1.5 }
fn default_vote_threshold() -> f64 { 0.5 }
fn default_min_duration_seconds() -> f64 { 1.0 }
fn default_cooldown_seconds() -> f64 { 2.0 }
fn default_skip_frames() -> usize { 3 }

fn default_personal_weight() -> f64 { 0.7 }
fn default_baseline_weight() -> f64 { 0.3 }
fn default_iqr_multiplier() -> f64 { 1.5 }
fn default_std_multiplier() -> f64 { 1.5 }
fn default_std_floor_ratio() -> f64 { 0.1 }
fn default_min_samples() -> usize { 5 }
fn default_min_iqr_samples() -> usize { 4 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            landmark_confidence: default_landmark_confidence(),
            smooth_window: default_smooth_window(),
            detrend_window: default_detrend_window(),
            peak_prominence: default_peak_prominence(),
            peak_distance: default_peak_distance(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            person_confidence: default_person_confidence(),
            fall_confidence: default_fall_confidence(),
            confidence_threshold: default_confidence_threshold(),
            iou_threshold: default_iou_threshold(),
            two_stage: default_two_stage(),
        }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            vote_threshold: default_vote_threshold(),
            min_duration_seconds: default_min_duration_seconds(),
            cooldown_seconds: default_cooldown_seconds(),
            skip_frames: default_skip_frames(),
        }
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            personal_weight: default_personal_weight(),
            baseline_weight: default_baseline_weight(),
            iqr_multiplier: default_iqr_multiplier(),
            std_multiplier: default_std_multiplier(),
            std_floor_ratio: default_std_floor_ratio(),
            min_samples: default_min_samples(),
            min_iqr_samples: default_min_iqr_samples(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 読み込めなければデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    "設定ファイル {} を読み込めません ({})。デフォルト設定を使用します",
                    path.as_ref().display(),
                    err
                );
                Self::default()
            }
        }
    }
}

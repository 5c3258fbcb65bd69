use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::detect::{fall_warning, FallEvent};
use crate::gait::{GaitAnalysis, GaitMetrics, MetricKind};

/// 報告書の 1 行 (指標・数値・単位)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRow {
    pub name: String,
    pub label: String,
    pub value: Option<f64>,
    pub unit: String,
}

/// 外部の保存・通知系に引き渡す解析結果一式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub fps: f64,
    pub frame_count: usize,
    pub has_valid_gait: bool,
    pub first_cycle_frame: Option<usize>,
    pub metrics: GaitMetrics,
    pub rows: Vec<MetricRow>,
    pub fall_events: Vec<FallEvent>,
    pub warning: Option<String>,
}

impl AnalysisReport {
    pub fn build(analysis: &GaitAnalysis, fall_events: Vec<FallEvent>) -> Self {
        let rows = MetricKind::ALL
            .iter()
            .map(|&kind| MetricRow {
                name: kind.name().to_string(),
                label: kind.label().to_string(),
                value: analysis.metrics.get(kind),
                unit: kind.unit().to_string(),
            })
            .collect();
        let warning = fall_warning(&fall_events);
        Self {
            fps: analysis.fps,
            frame_count: analysis.frame_count,
            has_valid_gait: analysis.has_valid_gait,
            first_cycle_frame: analysis.first_cycle_frame,
            metrics: analysis.metrics.clone(),
            rows,
            fall_events,
            warning,
        }
    }
}

/// 被験者 1 人分の指標履歴。解析のたびに 1 エントリ追記する
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricHistory {
    entries: BTreeMap<String, Vec<Option<f64>>>,
}

impl MetricHistory {
    pub fn push(&mut self, metrics: &GaitMetrics) {
        for kind in MetricKind::ALL {
            self.entries.entry(kind.name().to_string()).or_default().push(metrics.get(kind));
        }
    }

    /// 指標 1 つ分の値列。未計測の回は飛ばす
    pub fn values(&self, kind: MetricKind) -> Vec<f64> {
        self.entries
            .get(kind.name())
            .map(|v| v.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// 記録済みの解析回数
    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// --- Save / Load ---

pub fn save_report(path: &str, report: &AnalysisReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).context("Failed to write report file")?;
    Ok(())
}

pub fn load_report(path: &str) -> Result<AnalysisReport> {
    let content = fs::read_to_string(path).context("Failed to read report file")?;
    let report: AnalysisReport = serde_json::from_str(&content)?;
    Ok(report)
}

pub fn save_history(path: &str, history: &MetricHistory) -> Result<()> {
    let json = serde_json::to_string_pretty(history)?;
    fs::write(path, json).context("Failed to write metric history file")?;
    Ok(())
}

pub fn load_history(path: &str) -> Result<MetricHistory> {
    let content = fs::read_to_string(path).context("Failed to read metric history file")?;
    let history: MetricHistory = serde_json::from_str(&content)?;
    Ok(history)
}

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EventConfig;

/// 確定した転倒イベント
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FallEvent {
    pub start_frame: usize,
    pub end_frame: usize,
    pub start_time: f64,
    pub end_time: f64,
    /// 秒単位の持続時間
    pub duration: f64,
    /// イベント区間の平均転倒信頼度
    pub confidence: f64,
}

/// 多数決窓と進行中イベントの状態
#[derive(Debug)]
struct WindowState {
    window: VecDeque<bool>,
    in_event: bool,
    event_start: Option<usize>,
    confidence_sum: f64,
    confidence_count: usize,
    steps_since_last_event: usize,
}

impl WindowState {
    fn new(cooldown_steps: usize) -> Self {
        Self {
            window: VecDeque::new(),
            in_event: false,
            event_start: None,
            confidence_sum: 0.0,
            confidence_count: 0,
            // 初回イベントが冷却で抑制されないよう満了状態から始める
            steps_since_last_event: cooldown_steps,
        }
    }

    fn clear_event(&mut self) {
        self.in_event = false;
        self.event_start = None;
        self.confidence_sum = 0.0;
        self.confidence_count = 0;
    }
}

/// フレーム単位の転倒判定を多数決・最小持続・クールダウンで
/// イベント列に集約する状態機械
///
/// 入力は間引き後のサンプル列でよいが、フレーム番号と時間計算は
/// 常に元動画のフレーム番号で行う
pub struct EventDetector {
    window_size: usize,
    /// 多数決を始める最小サンプル数
    min_fill: usize,
    vote_threshold: f64,
    /// 元フレーム数で数えた最小持続
    min_duration_frames: usize,
    cooldown_steps: usize,
    fps: f64,
    state: WindowState,
    events: Vec<FallEvent>,
}

impl EventDetector {
    pub fn new(config: &EventConfig, fps: f64) -> Self {
        let skip = config.skip_frames.max(1);
        let window_size = ((fps * config.window_seconds / skip as f64) as usize).max(5);
        let min_duration_steps =
            ((fps * config.min_duration_seconds / skip as f64) as usize).max(2);
        let cooldown_steps = (fps * config.cooldown_seconds / skip as f64) as usize;
        Self {
            window_size,
            min_fill: window_size.min(3),
            vote_threshold: config.vote_threshold,
            min_duration_frames: min_duration_steps * skip,
            cooldown_steps,
            fps,
            state: WindowState::new(cooldown_steps),
            events: Vec::new(),
        }
    }

    /// サンプル 1 つ分進める。平滑化後の転倒フラグを返す
    pub fn step(&mut self, frame: usize, fall_detected: bool, confidence: f64) -> bool {
        self.state.window.push_back(fall_detected);
        if self.state.window.len() > self.window_size {
            self.state.window.pop_front();
        }
        // 窓が埋まるまでは常に偽
        let smoothed = if self.state.window.len() >= self.min_fill {
            let votes = self.state.window.iter().filter(|&&f| f).count();
            votes as f64 / self.state.window.len() as f64 >= self.vote_threshold
        } else {
            false
        };
        self.state.steps_since_last_event += 1;

        if smoothed {
            if !self.state.in_event {
                if self.state.steps_since_last_event >= self.cooldown_steps {
                    self.state.in_event = true;
                    self.state.event_start = Some(frame);
                    self.state.confidence_sum = confidence;
                    self.state.confidence_count = 1;
                }
            } else {
                self.state.confidence_sum += confidence;
                self.state.confidence_count += 1;
            }
        } else if self.state.in_event {
            self.close_event(frame);
        }
        smoothed
    }

    /// ストリーム終端。進行中のイベントは最終フレームで閉じる
    pub fn finish(mut self, last_frame: usize) -> Vec<FallEvent> {
        if self.state.in_event {
            self.close_event(last_frame);
        }
        self.events
    }

    fn close_event(&mut self, end_frame: usize) {
        let Some(start_frame) = self.state.event_start else {
            self.state.clear_event();
            return;
        };
        let span = end_frame.saturating_sub(start_frame);
        if span >= self.min_duration_frames {
            let confidence =
                self.state.confidence_sum / self.state.confidence_count.max(1) as f64;
            let event = FallEvent {
                start_frame,
                end_frame,
                start_time: start_frame as f64 / self.fps,
                end_time: end_frame as f64 / self.fps,
                duration: span as f64 / self.fps,
                confidence,
            };
            info!(
                "転倒イベントを確定: {:.2}s - {:.2}s (持続 {:.2}s, 信頼度 {:.2})",
                event.start_time, event.end_time, event.duration, event.confidence
            );
            self.events.push(event);
            // 冷却はイベント確定時のみリセットする
            self.state.steps_since_last_event = 0;
        } else {
            debug!("持続 {:.2}s の候補は下限未満のため破棄", span as f64 / self.fps);
        }
        self.state.clear_event();
    }
}

/// 検出済みイベントから利用者向けの警告文を組み立てる
pub fn fall_warning(events: &[FallEvent]) -> Option<String> {
    if events.is_empty() {
        return None;
    }
    let times: Vec<String> = events.iter().map(|e| format!("{:.2}", e.start_time)).collect();
    Some(format!("警告: {} 秒付近で転倒を検出しました", times.join(", ")))
}

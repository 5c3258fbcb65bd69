use crate::config::DetectionConfig;

use super::boxes::{BoundingBox, ClassedBox, PersonBox};

/// 人体ボックスと転倒分類を関連付けた 1 人分の結果
#[derive(Debug, Clone)]
pub struct MatchedPerson {
    pub bbox: BoundingBox,
    pub is_fall: bool,
    /// 人体検出の信頼度
    pub confidence: f64,
    /// 転倒分類の信頼度 (転倒でなければ 0)
    pub fall_confidence: f64,
    /// 採用した分類ボックスとの IoU
    pub overlap: f64,
}

/// 1 フレーム分の集計
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameAggregate {
    pub fall_detected: bool,
    /// フレーム内の転倒信頼度の最大値
    pub confidence: f64,
    pub fall_count: usize,
    pub normal_count: usize,
    pub total_persons: usize,
}

impl FrameAggregate {
    fn from_persons(persons: &[MatchedPerson]) -> Self {
        let mut fall_count = 0;
        let mut normal_count = 0;
        let mut confidence = 0.0f64;
        for p in persons {
            if p.is_fall {
                fall_count += 1;
                confidence = confidence.max(p.fall_confidence);
            } else {
                normal_count += 1;
            }
        }
        Self {
            fall_detected: fall_count > 0,
            confidence,
            fall_count,
            normal_count,
            total_persons: persons.len(),
        }
    }
}

/// 1 フレーム分の関連付け結果
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub persons: Vec<MatchedPerson>,
    pub aggregate: FrameAggregate,
}

/// 二段検出の関連付け
///
/// 転倒分類器単体では人以外の物体を誤検出することがあるため、
/// 独立した人体検出で確認できたボックスにだけ分類を割り当てる
pub struct Associator {
    config: DetectionConfig,
}

impl Associator {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// 設定に応じて二段/単段を切り替える
    pub fn process_frame(&self, persons: &[PersonBox], detections: &[ClassedBox]) -> FrameOutcome {
        if self.config.two_stage {
            self.associate(persons, detections)
        } else {
            self.classify_single_stage(detections)
        }
    }

    /// 人体ボックスごとに最も重なる分類ボックスを探して状態を決める
    pub fn associate(&self, persons: &[PersonBox], detections: &[ClassedBox]) -> FrameOutcome {
        let detections: Vec<ClassedBox> = detections
            .iter()
            .copied()
            .filter(|d| d.confidence >= self.config.fall_confidence)
            .collect();
        let matched: Vec<MatchedPerson> = persons
            .iter()
            .filter(|p| p.confidence >= self.config.person_confidence)
            .map(|p| self.match_person(p, &detections))
            .collect();
        FrameOutcome { aggregate: FrameAggregate::from_persons(&matched), persons: matched }
    }

    /// 人体ゲートなしで分類ボックスをそのまま採用する
    pub fn classify_single_stage(&self, detections: &[ClassedBox]) -> FrameOutcome {
        let matched: Vec<MatchedPerson> = detections
            .iter()
            .filter(|d| d.confidence >= self.config.confidence_threshold)
            .map(|d| MatchedPerson {
                bbox: d.bbox,
                is_fall: d.class.is_fall(),
                confidence: d.confidence,
                fall_confidence: if d.class.is_fall() { d.confidence } else { 0.0 },
                overlap: 0.0,
            })
            .collect();
        FrameOutcome { aggregate: FrameAggregate::from_persons(&matched), persons: matched }
    }

    /// IoU 閾値を超える候補のうち最大のものだけが状態を決める。
    /// 候補なしは正常扱い
    fn match_person(&self, person: &PersonBox, detections: &[ClassedBox]) -> MatchedPerson {
        let mut best: Option<(ClassedBox, f64)> = None;
        for d in detections {
            let iou = person.bbox.iou(&d.bbox);
            if iou > self.config.iou_threshold && best.map_or(true, |(_, b)| iou > b) {
                best = Some((*d, iou));
            }
        }
        match best {
            Some((d, iou)) => {
                let is_fall = d.class.is_fall();
                MatchedPerson {
                    bbox: person.bbox,
                    is_fall,
                    confidence: person.confidence,
                    fall_confidence: if is_fall { d.confidence } else { 0.0 },
                    overlap: iou,
                }
            }
            None => MatchedPerson {
                bbox: person.bbox,
                is_fall: false,
                confidence: person.confidence,
                fall_confidence: 0.0,
                overlap: 0.0,
            },
        }
    }
}

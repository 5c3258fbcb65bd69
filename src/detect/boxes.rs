use serde::{Deserialize, Serialize};

/// バウンディングボックス（左上 x1,y1 と右下 x2,y2）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_xyxy(coords: [f64; 4]) -> Self {
        Self { x1: coords[0], y1: coords[1], x2: coords[2], y2: coords[3] }
    }

    pub fn area(&self) -> f64 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    /// 交差領域の面積 / 和領域の面積。和領域が 0 以下なら 0
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);
        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// 人体検出の出力
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PersonBox {
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// 転倒分類器の出力クラス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallClass {
    Fall,
    Normal,
}

impl FallClass {
    /// モデルのクラス名から変換。fall 以外はすべて normal 扱い
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("fall") {
            FallClass::Fall
        } else {
            FallClass::Normal
        }
    }

    pub fn is_fall(self) -> bool {
        matches!(self, FallClass::Fall)
    }
}

/// 転倒分類付きボックス
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassedBox {
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub class: FallClass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical_boxes() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(2.0, 2.0, 3.0, 3.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // 交差 50、和 150
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_degenerate_box() {
        let a = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        let b = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
        // 和領域 0 は 0 を返す (ゼロ除算しない)
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_fall_class_from_label() {
        assert_eq!(FallClass::from_label("fall"), FallClass::Fall);
        assert_eq!(FallClass::from_label("Fall"), FallClass::Fall);
        assert_eq!(FallClass::from_label("normal"), FallClass::Normal);
        assert_eq!(FallClass::from_label("walking"), FallClass::Normal);
    }
}

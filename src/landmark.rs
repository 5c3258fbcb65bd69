/// 歩行解析に必要な 9 ランドマークのインデックス
///
/// COCO 17 キーポイントのうち、歩行・転倒解析で参照する部分集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftShoulder = 1,
    RightShoulder = 2,
    LeftHip = 3,
    RightHip = 4,
    LeftKnee = 5,
    RightKnee = 6,
    LeftAnkle = 7,
    RightAnkle = 8,
}

impl LandmarkIndex {
    pub const COUNT: usize = 9;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftShoulder),
            2 => Some(Self::RightShoulder),
            3 => Some(Self::LeftHip),
            4 => Some(Self::RightHip),
            5 => Some(Self::LeftKnee),
            6 => Some(Self::RightKnee),
            7 => Some(Self::LeftAnkle),
            8 => Some(Self::RightAnkle),
            _ => None,
        }
    }

    /// 外部ストリームで使う名前 (snake_case)
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nose" => Some(Self::Nose),
            "left_shoulder" => Some(Self::LeftShoulder),
            "right_shoulder" => Some(Self::RightShoulder),
            "left_hip" => Some(Self::LeftHip),
            "right_hip" => Some(Self::RightHip),
            "left_knee" => Some(Self::LeftKnee),
            "right_knee" => Some(Self::RightKnee),
            "left_ankle" => Some(Self::LeftAnkle),
            "right_ankle" => Some(Self::RightAnkle),
            _ => None,
        }
    }
}

/// 体の左右
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn ankle(self) -> LandmarkIndex {
        match self {
            Self::Left => LandmarkIndex::LeftAnkle,
            Self::Right => LandmarkIndex::RightAnkle,
        }
    }

    pub fn knee(self) -> LandmarkIndex {
        match self {
            Self::Left => LandmarkIndex::LeftKnee,
            Self::Right => LandmarkIndex::RightKnee,
        }
    }

    pub fn hip(self) -> LandmarkIndex {
        match self {
            Self::Left => LandmarkIndex::LeftHip,
            Self::Right => LandmarkIndex::RightHip,
        }
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// 正規化された X 座標 (0.0〜1.0)
    pub x: f64,
    /// 正規化された Y 座標 (0.0〜1.0)
    pub y: f64,
    /// 検出器の信頼度スコア (0.0〜1.0)
    pub confidence: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が受け入れ閾値を超えているか
    pub fn is_valid(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

/// 1 フレーム分のランドマーク集合
///
/// 検出されなかった点は confidence 0 のまま残り、`valid` では取得できない。
#[derive(Debug, Clone)]
pub struct LandmarkFrame {
    /// 元映像のフレーム番号
    pub index: usize,
    pub points: [Landmark; LandmarkIndex::COUNT],
}

impl LandmarkFrame {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            points: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }

    pub fn set(&mut self, index: LandmarkIndex, point: Landmark) {
        self.points[index as usize] = point;
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.points[index as usize]
    }

    /// 閾値を超えたランドマークのみ返す
    pub fn valid(&self, index: LandmarkIndex, threshold: f64) -> Option<&Landmark> {
        let point = self.get(index);
        point.is_valid(threshold).then_some(point)
    }

    /// 必要な全ランドマークが閾値を超えているか
    pub fn is_complete(&self, threshold: f64) -> bool {
        self.points.iter().all(|p| p.is_valid(threshold))
    }

    /// フレーム番号から求めたタイムスタンプ (秒)
    pub fn timestamp(&self, fps: f64) -> f64 {
        self.index as f64 / fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 9);
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(8), Some(LandmarkIndex::RightAnkle));
        assert_eq!(LandmarkIndex::from_index(9), None);
    }

    #[test]
    fn test_landmark_index_name_roundtrip() {
        for i in 0..LandmarkIndex::COUNT {
            let index = LandmarkIndex::from_index(i).unwrap();
            assert_eq!(LandmarkIndex::from_name(index.name()), Some(index));
        }
        assert_eq!(LandmarkIndex::from_name("left_elbow"), None);
    }

    #[test]
    fn test_landmark_is_valid_is_strict() {
        // 閾値ちょうどは「超えた」とみなさない
        let point = Landmark::new(0.5, 0.5, 0.3);
        assert!(!point.is_valid(0.3));
        assert!(point.is_valid(0.2));
    }

    #[test]
    fn test_side_accessors() {
        assert_eq!(Side::Left.ankle(), LandmarkIndex::LeftAnkle);
        assert_eq!(Side::Right.ankle(), LandmarkIndex::RightAnkle);
        assert_eq!(Side::Left.knee(), LandmarkIndex::LeftKnee);
        assert_eq!(Side::Right.hip(), LandmarkIndex::RightHip);
    }

    #[test]
    fn test_frame_valid_filters_low_confidence() {
        let mut frame = LandmarkFrame::new(0);
        frame.set(LandmarkIndex::LeftAnkle, Landmark::new(0.4, 0.8, 0.9));
        frame.set(LandmarkIndex::RightAnkle, Landmark::new(0.6, 0.8, 0.1));

        assert!(frame.valid(LandmarkIndex::LeftAnkle, 0.3).is_some());
        assert!(frame.valid(LandmarkIndex::RightAnkle, 0.3).is_none());
        // 一度もセットしていない点は confidence 0
        assert!(frame.valid(LandmarkIndex::Nose, 0.3).is_none());
    }

    #[test]
    fn test_frame_is_complete() {
        let mut frame = LandmarkFrame::new(0);
        for i in 0..LandmarkIndex::COUNT {
            let index = LandmarkIndex::from_index(i).unwrap();
            frame.set(index, Landmark::new(0.5, 0.5, 0.9));
        }
        assert!(frame.is_complete(0.3));

        frame.set(LandmarkIndex::Nose, Landmark::new(0.5, 0.5, 0.2));
        assert!(!frame.is_complete(0.3));
    }

    #[test]
    fn test_frame_timestamp() {
        let frame = LandmarkFrame::new(90);
        assert!((frame.timestamp(30.0) - 3.0).abs() < 1e-9);
    }
}

use nalgebra::Vector2;
use ndarray::Array1;

use crate::landmark::{LandmarkFrame, LandmarkIndex, Side};

/// 欠損補完済みの 1 次元時系列
///
/// ランドマークが欠けたフレームは前方の有効値で埋め、
/// 先頭の欠損のみ後方の最初の有効値で埋める。
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub values: Array1<f64>,
    /// 補完前に実測値があったフレーム数
    pub valid_count: usize,
}

impl Trajectory {
    /// 全フレーム欠損の場合は None
    pub fn build(samples: &[Option<f64>]) -> Option<Self> {
        let valid_count = samples.iter().filter(|s| s.is_some()).count();
        if valid_count == 0 {
            return None;
        }
        let mut filled: Vec<Option<f64>> = Vec::with_capacity(samples.len());
        let mut last = None;
        for s in samples {
            if s.is_some() {
                last = *s;
            }
            filled.push(last);
        }
        // 残る欠損は先頭のみ。後方の有効値で埋める
        let mut next = None;
        for slot in filled.iter_mut().rev() {
            match slot {
                Some(v) => next = Some(*v),
                None => *slot = next,
            }
        }
        let values: Array1<f64> = filled.into_iter().flatten().collect();
        Some(Self { values, valid_count })
    }

    pub fn from_values(values: Array1<f64>) -> Self {
        let valid_count = values.len();
        Self { values, valid_count }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 歩行指標の計算に使う身体部位の時系列一式
///
/// 各系列は必要なランドマークが一度も観測されなければ None
#[derive(Debug, Clone)]
pub struct BodySignals {
    pub frame_count: usize,
    pub left_ankle_x: Option<Trajectory>,
    pub left_ankle_y: Option<Trajectory>,
    pub right_ankle_x: Option<Trajectory>,
    pub right_ankle_y: Option<Trajectory>,
    pub torso_tilt: Option<Trajectory>,
    pub left_knee_angle: Option<Trajectory>,
    pub right_knee_angle: Option<Trajectory>,
}

impl BodySignals {
    pub fn build(frames: &[LandmarkFrame], threshold: f64) -> Self {
        let n = frames.len();
        let mut left_ankle_x = Vec::with_capacity(n);
        let mut left_ankle_y = Vec::with_capacity(n);
        let mut right_ankle_x = Vec::with_capacity(n);
        let mut right_ankle_y = Vec::with_capacity(n);
        let mut torso_tilt = Vec::with_capacity(n);
        let mut left_knee = Vec::with_capacity(n);
        let mut right_knee = Vec::with_capacity(n);

        for frame in frames {
            let la = frame.valid(LandmarkIndex::LeftAnkle, threshold);
            left_ankle_x.push(la.map(|p| p.x));
            left_ankle_y.push(la.map(|p| p.y));
            let ra = frame.valid(LandmarkIndex::RightAnkle, threshold);
            right_ankle_x.push(ra.map(|p| p.x));
            right_ankle_y.push(ra.map(|p| p.y));
            torso_tilt.push(torso_tilt_sample(frame, threshold));
            left_knee.push(knee_angle_sample(frame, Side::Left, threshold));
            right_knee.push(knee_angle_sample(frame, Side::Right, threshold));
        }

        Self {
            frame_count: n,
            left_ankle_x: Trajectory::build(&left_ankle_x),
            left_ankle_y: Trajectory::build(&left_ankle_y),
            right_ankle_x: Trajectory::build(&right_ankle_x),
            right_ankle_y: Trajectory::build(&right_ankle_y),
            torso_tilt: Trajectory::build(&torso_tilt),
            left_knee_angle: Trajectory::build(&left_knee),
            right_knee_angle: Trajectory::build(&right_knee),
        }
    }

    pub fn ankle_x(&self, side: Side) -> Option<&Trajectory> {
        match side {
            Side::Left => self.left_ankle_x.as_ref(),
            Side::Right => self.right_ankle_x.as_ref(),
        }
    }

    pub fn ankle_y(&self, side: Side) -> Option<&Trajectory> {
        match side {
            Side::Left => self.left_ankle_y.as_ref(),
            Side::Right => self.right_ankle_y.as_ref(),
        }
    }

    pub fn knee_angle(&self, side: Side) -> Option<&Trajectory> {
        match side {
            Side::Left => self.left_knee_angle.as_ref(),
            Side::Right => self.right_knee_angle.as_ref(),
        }
    }
}

/// 肩中点→腰中点の線分が鉛直となす角 (度)
///
/// 左右の肩と腰が全て有効なフレームのみ
fn torso_tilt_sample(frame: &LandmarkFrame, threshold: f64) -> Option<f64> {
    let ls = frame.valid(LandmarkIndex::LeftShoulder, threshold)?;
    let rs = frame.valid(LandmarkIndex::RightShoulder, threshold)?;
    let lh = frame.valid(LandmarkIndex::LeftHip, threshold)?;
    let rh = frame.valid(LandmarkIndex::RightHip, threshold)?;
    let shoulder_mid = Vector2::new((ls.x + rs.x) / 2.0, (ls.y + rs.y) / 2.0);
    let hip_mid = Vector2::new((lh.x + rh.x) / 2.0, (lh.y + rh.y) / 2.0);
    let d = hip_mid - shoulder_mid;
    Some(d.x.abs().atan2(d.y.abs()).to_degrees())
}

/// 股関節-膝-足首のなす角 (度)。伸びた脚ほど 180 に近い
fn knee_angle_sample(frame: &LandmarkFrame, side: Side, threshold: f64) -> Option<f64> {
    let hip = frame.valid(side.hip(), threshold)?;
    let knee = frame.valid(side.knee(), threshold)?;
    let ankle = frame.valid(side.ankle(), threshold)?;
    let v1 = Vector2::new(hip.x - knee.x, hip.y - knee.y);
    let v2 = Vector2::new(ankle.x - knee.x, ankle.y - knee.y);
    let cos = v1.dot(&v2) / (v1.norm() * v2.norm() + 1e-8);
    Some(cos.clamp(-1.0, 1.0).acos().to_degrees())
}

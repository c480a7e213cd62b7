//! 原始成绩值
//!
//! 每个 (评测, 学生) 对应一个 `Score`：要么是 `[0, max]` 内的实数，
//! 要么是三种标记之一。JSON 中数值按数字表示，标记按 `"ABS"`、`"EXC"`、`"ATT"` 表示。

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// 实际分数（未换算，范围 `[0, max]`）
    Numeric(f64),
    /// 缺考，按 0 分计入，系数照常
    Absent,
    /// 免考（neutralisé），连同系数一起排除
    Excused,
    /// 待定，暂不计入
    Pending,
}

impl Score {
    pub const ABSENT_CODE: &'static str = "ABS";
    pub const EXCUSED_CODE: &'static str = "EXC";
    pub const PENDING_CODE: &'static str = "ATT";

    /// 参与加权平均时的取值（满分 20），免考和待定返回 `None`
    pub fn on_twenty(&self, max_score: f64) -> Option<f64> {
        match self {
            Score::Numeric(value) => Some(value * 20.0 / max_score),
            Score::Absent => Some(0.0),
            Score::Excused | Score::Pending => None,
        }
    }

    /// 是否为实际分数
    pub fn is_numeric(&self) -> bool {
        matches!(self, Score::Numeric(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Score::Pending)
    }

    /// 存储用的类型代码
    pub fn kind_code(&self) -> &'static str {
        match self {
            Score::Numeric(_) => "NUM",
            Score::Absent => Self::ABSENT_CODE,
            Score::Excused => Self::EXCUSED_CODE,
            Score::Pending => Self::PENDING_CODE,
        }
    }

    /// 从存储的 (类型代码, 数值) 还原
    pub fn from_parts(kind: &str, value: Option<f64>) -> Option<Self> {
        match (kind, value) {
            ("NUM", Some(v)) => Some(Score::Numeric(v)),
            (Self::ABSENT_CODE, _) => Some(Score::Absent),
            (Self::EXCUSED_CODE, _) => Some(Score::Excused),
            (Self::PENDING_CODE, _) => Some(Score::Pending),
            _ => None,
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Score::Numeric(v) => Some(*v),
            _ => None,
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Score::Numeric(v) => serializer.serialize_f64(*v),
            other => serializer.serialize_str(other.kind_code()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawScore::deserialize(deserializer)? {
            RawScore::Number(v) => Ok(Score::Numeric(v)),
            RawScore::Text(code) => match code.to_ascii_uppercase().as_str() {
                Self::ABSENT_CODE => Ok(Score::Absent),
                Self::EXCUSED_CODE => Ok(Score::Excused),
                Self::PENDING_CODE => Ok(Score::Pending),
                _ => Err(serde::de::Error::custom(format!(
                    "unknown score code '{code}', expected a number, ABS, EXC or ATT"
                ))),
            },
        }
    }
}

/// 学生在本学期的缺勤统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AbsenceCounts {
    pub total: u32,
    pub justified: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_twenty() {
        assert_eq!(Score::Numeric(5.0).on_twenty(10.0), Some(10.0));
        assert_eq!(Score::Absent.on_twenty(10.0), Some(0.0));
        assert_eq!(Score::Excused.on_twenty(10.0), None);
        assert_eq!(Score::Pending.on_twenty(10.0), None);
    }

    #[test]
    fn test_json_representation() {
        let scores = vec![Score::Numeric(12.5), Score::Absent, Score::Excused, Score::Pending];
        let json = serde_json::to_string(&scores).unwrap();
        assert_eq!(json, r#"[12.5,"ABS","EXC","ATT"]"#);

        let parsed: Vec<Score> = serde_json::from_str(r#"[3, "abs", "ATT"]"#).unwrap();
        assert_eq!(parsed, vec![Score::Numeric(3.0), Score::Absent, Score::Pending]);

        assert!(serde_json::from_str::<Score>(r#""DEM""#).is_err());
    }

    #[test]
    fn test_storage_parts() {
        for score in [Score::Numeric(7.0), Score::Absent, Score::Excused, Score::Pending] {
            let restored = Score::from_parts(score.kind_code(), score.numeric_value());
            assert_eq!(restored, Some(score));
        }
        assert_eq!(Score::from_parts("NUM", None), None);
    }
}

//! 计算结果的值类型

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 平均分：数值，或不可计算的标记
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Average {
    Numeric(f64),
    /// 无法计算（"NA"）
    #[default]
    NotAvailable,
    /// 未注册该模块（"NI"）
    NotEnrolled,
    /// 自定义公式出错（"ERR"）
    Error,
}

impl Average {
    pub fn value(&self) -> Option<f64> {
        match self {
            Average::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Average::Numeric(_))
    }

    /// 非数值时按 0 处理
    pub fn value_or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Average::Numeric(_) => "NUM",
            Average::NotAvailable => "NA",
            Average::NotEnrolled => "NI",
            Average::Error => "ERR",
        }
    }

    /// 按显示精度格式化（仅用于展示，计算中从不取整）
    pub fn display(&self, precision: usize) -> String {
        match self {
            Average::Numeric(v) => format!("{v:.precision$}"),
            other => other.code().to_string(),
        }
    }

    /// 排序比较：数值降序，非数值排在最后
    pub fn cmp_desc(&self, other: &Average) -> Ordering {
        match (self.value(), other.value()) {
            (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl From<f64> for Average {
    fn from(value: f64) -> Self {
        Average::Numeric(value)
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Average::Numeric(v) => write!(f, "{v:.2}"),
            other => f.write_str(other.code()),
        }
    }
}

impl Serialize for Average {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Average::Numeric(v) => serializer.serialize_f64(*v),
            other => serializer.serialize_str(other.code()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAverage {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Average {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawAverage::deserialize(deserializer)? {
            RawAverage::Number(v) => Ok(Average::Numeric(v)),
            RawAverage::Text(code) => match code.as_str() {
                "NA" => Ok(Average::NotAvailable),
                "NI" => Ok(Average::NotEnrolled),
                "ERR" => Ok(Average::Error),
                _ => Err(serde::de::Error::custom(format!("unknown average '{code}'"))),
            },
        }
    }
}

/// 名次，`tied` 为并列（显示为 "3 ex"）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub position: u32,
    pub tied: bool,
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tied {
            write!(f, "{} ex", self.position)
        } else {
            write!(f, "{}", self.position)
        }
    }
}

/// 计算过程中记录的诊断信息（公式错误、多个补考评测等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub moduleimpl_id: Option<i64>,
    pub ue_id: Option<i64>,
    pub student_id: Option<i64>,
    pub message: String,
}

impl Diagnostic {
    pub fn for_module(moduleimpl_id: i64, student_id: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            moduleimpl_id: Some(moduleimpl_id),
            ue_id: None,
            student_id,
            message: message.into(),
        }
    }

    pub fn for_ue(ue_id: i64, student_id: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            moduleimpl_id: None,
            ue_id: Some(ue_id),
            student_id,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_json() {
        let values = vec![
            Average::Numeric(12.5),
            Average::NotAvailable,
            Average::NotEnrolled,
            Average::Error,
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[12.5,"NA","NI","ERR"]"#);
        let back: Vec<Average> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_display_rounds_only_for_presentation() {
        let avg = Average::Numeric(38.0 / 3.0);
        assert_eq!(avg.display(2), "12.67");
        assert_eq!(avg.value(), Some(38.0 / 3.0));
        assert_eq!(Average::NotAvailable.display(2), "NA");
    }

    #[test]
    fn test_cmp_desc_puts_non_numeric_last() {
        let mut values = vec![
            Average::NotAvailable,
            Average::Numeric(8.0),
            Average::Error,
            Average::Numeric(15.0),
        ];
        values.sort_by(|a, b| a.cmp_desc(b));
        assert_eq!(values[0], Average::Numeric(15.0));
        assert_eq!(values[1], Average::Numeric(8.0));
        assert!(!values[2].is_numeric());
        assert!(!values[3].is_numeric());
    }

    #[test]
    fn test_rank_display() {
        assert_eq!(Rank { position: 3, tied: true }.to_string(), "3 ex");
        assert_eq!(Rank { position: 1, tied: false }.to_string(), "1");
    }
}

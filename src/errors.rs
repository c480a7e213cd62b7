//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。
//! 只有结构性错误和存储错误会向调用方传播；公式和数据错误在计算时被吸收为 NA/ERR。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_scodoc_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum ScoDocError {
            $($variant(String),)*
        }

        impl ScoDocError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(ScoDocError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(ScoDocError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(ScoDocError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl ScoDocError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        ScoDocError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_scodoc_errors! {
    CacheConnection("E001", "Cache Connection Error"),
    CachePluginNotFound("E002", "Cache Plugin Not Found"),
    DatabaseConfig("E003", "Database Configuration Error"),
    DatabaseConnection("E004", "Database Connection Error"),
    DatabaseOperation("E005", "Database Operation Error"),
    FileOperation("E006", "File Operation Error"),
    Validation("E007", "Validation Error"),
    NotFound("E008", "Resource Not Found"),
    Serialization("E009", "Serialization Error"),
    DateParse("E010", "Date Parse Error"),
    Structure("E011", "Inconsistent Semester Structure"),
    Formula("E012", "Formula Error"),
}

impl ScoDocError {
    /// 格式化为彩色输出（用于开发环境）
    #[cfg(debug_assertions)]
    pub fn format_colored(&self) -> String {
        format!(
            "\x1b[1;31m[ERROR]\x1b[0m \x1b[33m{}\x1b[0m \x1b[31m{}\x1b[0m\n  {}",
            self.code(),
            self.error_type(),
            self.message()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// 是否为结构性错误（该学期成绩表暂不可用）
    pub fn is_structural(&self) -> bool {
        matches!(self, ScoDocError::Structure(_))
    }
}

impl fmt::Display for ScoDocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ScoDocError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ScoDocError {
    fn from(err: sea_orm::DbErr) -> Self {
        ScoDocError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ScoDocError {
    fn from(err: std::io::Error) -> Self {
        ScoDocError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ScoDocError {
    fn from(err: serde_json::Error) -> Self {
        ScoDocError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for ScoDocError {
    fn from(err: chrono::ParseError) -> Self {
        ScoDocError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScoDocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ScoDocError::cache_connection("test").code(), "E001");
        assert_eq!(ScoDocError::database_config("test").code(), "E003");
        assert_eq!(ScoDocError::validation("test").code(), "E007");
        assert_eq!(ScoDocError::structure("test").code(), "E011");
        assert_eq!(ScoDocError::formula("test").code(), "E012");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            ScoDocError::cache_connection("test").error_type(),
            "Cache Connection Error"
        );
        assert_eq!(
            ScoDocError::structure("test").error_type(),
            "Inconsistent Semester Structure"
        );
    }

    #[test]
    fn test_error_message() {
        let err = ScoDocError::formula("unknown name 'os'");
        assert_eq!(err.message(), "unknown name 'os'");
    }

    #[test]
    fn test_format_simple() {
        let err = ScoDocError::validation("Invalid coefficient");
        let formatted = err.format_simple();
        assert!(formatted.contains("Validation Error"));
        assert!(formatted.contains("Invalid coefficient"));
    }

    #[test]
    fn test_only_structure_is_structural() {
        assert!(ScoDocError::structure("module 3 has no UE").is_structural());
        assert!(!ScoDocError::formula("bad").is_structural());
        assert!(!ScoDocError::database_operation("boom").is_structural());
    }
}

use std::fmt;

#[derive(Debug, Clone)]
pub enum ShortgateError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    QuotaExceededDaily(String),
    QuotaExceededMonthly(String),
    CodeSpaceExhausted(String),
    CodeTaken(String),
    FileOperation(String),
    Serialization(String),
    DateParse(String),
}

impl ShortgateError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortgateError::DatabaseConfig(_) => "E001",
            ShortgateError::DatabaseConnection(_) => "E002",
            ShortgateError::DatabaseOperation(_) => "E003",
            ShortgateError::Validation(_) => "E004",
            ShortgateError::NotFound(_) => "E005",
            ShortgateError::QuotaExceededDaily(_) => "E006",
            ShortgateError::QuotaExceededMonthly(_) => "E007",
            ShortgateError::CodeSpaceExhausted(_) => "E008",
            ShortgateError::CodeTaken(_) => "E009",
            ShortgateError::FileOperation(_) => "E010",
            ShortgateError::Serialization(_) => "E011",
            ShortgateError::DateParse(_) => "E012",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortgateError::DatabaseConfig(_) => "Database Configuration Error",
            ShortgateError::DatabaseConnection(_) => "Database Connection Error",
            ShortgateError::DatabaseOperation(_) => "Database Operation Error",
            ShortgateError::Validation(_) => "Validation Error",
            ShortgateError::NotFound(_) => "Resource Not Found",
            ShortgateError::QuotaExceededDaily(_) => "Daily Quota Exceeded",
            ShortgateError::QuotaExceededMonthly(_) => "Monthly Quota Exceeded",
            ShortgateError::CodeSpaceExhausted(_) => "Code Space Exhausted",
            ShortgateError::CodeTaken(_) => "Short Code Taken",
            ShortgateError::FileOperation(_) => "File Operation Error",
            ShortgateError::Serialization(_) => "Serialization Error",
            ShortgateError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortgateError::DatabaseConfig(msg) => msg,
            ShortgateError::DatabaseConnection(msg) => msg,
            ShortgateError::DatabaseOperation(msg) => msg,
            ShortgateError::Validation(msg) => msg,
            ShortgateError::NotFound(msg) => msg,
            ShortgateError::QuotaExceededDaily(msg) => msg,
            ShortgateError::QuotaExceededMonthly(msg) => msg,
            ShortgateError::CodeSpaceExhausted(msg) => msg,
            ShortgateError::CodeTaken(msg) => msg,
            ShortgateError::FileOperation(msg) => msg,
            ShortgateError::Serialization(msg) => msg,
            ShortgateError::DateParse(msg) => msg,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }

    /// 配额拒绝（日限或月限）
    pub fn is_quota_denial(&self) -> bool {
        matches!(
            self,
            ShortgateError::QuotaExceededDaily(_) | ShortgateError::QuotaExceededMonthly(_)
        )
    }
}

impl fmt::Display for ShortgateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 默认使用简洁格式
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortgateError {}

// 便捷的构造函数
impl ShortgateError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShortgateError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortgateError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortgateError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortgateError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortgateError::NotFound(msg.into())
    }

    pub fn quota_exceeded_daily<T: Into<String>>(msg: T) -> Self {
        ShortgateError::QuotaExceededDaily(msg.into())
    }

    pub fn quota_exceeded_monthly<T: Into<String>>(msg: T) -> Self {
        ShortgateError::QuotaExceededMonthly(msg.into())
    }

    pub fn code_space_exhausted<T: Into<String>>(msg: T) -> Self {
        ShortgateError::CodeSpaceExhausted(msg.into())
    }

    pub fn code_taken<T: Into<String>>(msg: T) -> Self {
        ShortgateError::CodeTaken(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortgateError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortgateError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        ShortgateError::DateParse(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for ShortgateError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortgateError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ShortgateError {
    fn from(err: std::io::Error) -> Self {
        ShortgateError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ShortgateError {
    fn from(err: serde_json::Error) -> Self {
        ShortgateError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for ShortgateError {
    fn from(err: chrono::ParseError) -> Self {
        ShortgateError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortgateError>;

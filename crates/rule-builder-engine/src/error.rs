//! 规则翻译引擎错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("表达式翻译失败: {0}")]
    Translation(String),

    #[error("无法更新 {target} 规则: 请求更新的 id ({id}) 不存在")]
    StaleReference { id: i64, target: String },

    #[error("不支持的规则字段 ({field}): {reason}")]
    UnsupportedField { field: String, reason: String },

    #[error("目标对象缺少字段: {0}")]
    FieldNotAvailable(String),

    #[error("未注册的字段服务配置: {0}")]
    UnknownFieldService(String),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;

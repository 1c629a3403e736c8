use serde::{Deserialize, Serialize};

/// Scalar value bound to a placeholder. Bind maps are string-typed at the
/// statement-execution boundary, so every variant has a stable string form:
/// - Null renders as the empty string
/// - Bool renders as "1"/"0"
/// - Int/Float render in their canonical decimal form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl BindValue {
    pub fn render(&self) -> String {
        match self {
            BindValue::Null => String::new(),
            BindValue::Bool(b) => {
                if *b {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
            BindValue::Int(n) => n.to_string(),
            BindValue::Float(f) => f.to_string(),
            BindValue::Str(s) => s.clone(),
        }
    }
}

impl From<&str> for BindValue {
    fn from(s: &str) -> Self {
        BindValue::Str(s.to_string())
    }
}

impl From<String> for BindValue {
    fn from(s: String) -> Self {
        BindValue::Str(s)
    }
}

impl From<i64> for BindValue {
    fn from(n: i64) -> Self {
        BindValue::Int(n)
    }
}

impl From<i32> for BindValue {
    fn from(n: i32) -> Self {
        BindValue::Int(n as i64)
    }
}

impl From<u32> for BindValue {
    fn from(n: u32) -> Self {
        BindValue::Int(n as i64)
    }
}

impl From<f64> for BindValue {
    fn from(f: f64) -> Self {
        BindValue::Float(f)
    }
}

impl From<bool> for BindValue {
    fn from(b: bool) -> Self {
        BindValue::Bool(b)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => BindValue::Null,
        }
    }
}

use serde::Deserialize;
use serde_json::Value;

/// Fields are kept untyped: anything that is not a string (missing, null,
/// numbers, objects) simply fails verification.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<Value>,
    pub password: Option<Value>,
}

impl LoginRequest {
    /// Both credentials, when both were sent as strings.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((as_text(&self.username)?, as_text(&self.password)?))
    }
}

fn as_text(value: &Option<Value>) -> Option<&str> {
    value.as_ref().and_then(Value::as_str)
}

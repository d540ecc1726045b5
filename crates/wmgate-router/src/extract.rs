use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::GatewayError;

/// Two-stage body parse: malformed JSON and schema mismatches are reported
/// differently.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| GatewayError::InvalidJson)?;
    if value.is_null() {
        return Err(GatewayError::InvalidJson);
    }
    serde_json::from_value(value).map_err(|err| GatewayError::InvalidRequest(vec![err.to_string()]))
}

pub(crate) fn ensure_valid(issues: Vec<String>) -> Result<(), GatewayError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::InvalidRequest(issues))
    }
}

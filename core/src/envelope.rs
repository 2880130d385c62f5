//! The response envelope every service endpoint answers with.
//!
//! ```json
//! {"statusCode": "OK", "responseData": {...}}
//! {"statusCode": "ERROR", "responseData": {"errCode": "E1", "errDesc": "bad input"}}
//! ```
//!
//! `statusCode` is read first; only then is `responseData` decoded, either
//! into the caller's payload type or into a `ServiceError`. A body without
//! a string `statusCode` is malformed, never an implicit success.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec;
use crate::error::ClientError;

pub const STATUS_FIELD: &str = "statusCode";
pub const DATA_FIELD: &str = "responseData";
pub const STATUS_OK: &str = "OK";

/// Business error reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    #[serde(rename = "errCode")]
    pub code: String,
    #[serde(rename = "errDesc")]
    pub description: String,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.description, self.code)
    }
}

impl std::error::Error for ServiceError {}

/// A decoded envelope: exactly one of payload or service error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope<T> {
    Success { payload: T },
    Failure(ServiceError),
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// Turn a failure into `ClientError::Business`.
    pub fn into_result(self) -> Result<T, ClientError> {
        match self {
            Envelope::Success { payload } => Ok(payload),
            Envelope::Failure(err) => Err(ClientError::Business(err)),
        }
    }
}

/// Decode a response body into an envelope of `T`.
///
/// Malformed JSON, a missing or non-string `statusCode`, and a
/// `responseData` that does not fit the expected shape are all
/// `ClientError::Decode`. A missing `responseData` decodes as `null`, which
/// suits `()` and `Option<_>` payloads.
pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<Envelope<T>, ClientError> {
    let mut tree = codec::parse_tree(body)?;
    let Some(fields) = tree.as_object_mut() else {
        return Err(ClientError::decode("envelope is not a JSON object"));
    };

    let status = match fields.get(STATUS_FIELD) {
        Some(Value::String(status)) => status.clone(),
        Some(other) => {
            return Err(ClientError::decode(format!("{STATUS_FIELD} is not a string: {other}")));
        }
        None => return Err(ClientError::decode(format!("envelope has no {STATUS_FIELD}"))),
    };
    let data = fields.remove(DATA_FIELD).unwrap_or(Value::Null);

    if status == STATUS_OK {
        let payload = codec::from_value(data)?;
        Ok(Envelope::Success { payload })
    } else {
        let err: ServiceError = codec::from_value(data).map_err(|e| {
            ClientError::decode(format!("{status} envelope without error data: {e}"))
        })?;
        Ok(Envelope::Failure(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i64,
    }

    #[test]
    fn ok_envelope_decodes_payload() {
        let env: Envelope<Point> =
            decode_envelope(r#"{"statusCode":"OK","responseData":{"x":1}}"#).unwrap();
        assert_eq!(env, Envelope::Success { payload: Point { x: 1 } });
    }

    #[test]
    fn error_envelope_renders_description_and_code() {
        let env: Envelope<Point> = decode_envelope(
            r#"{"statusCode":"ERROR","responseData":{"errCode":"E1","errDesc":"bad input"}}"#,
        )
        .unwrap();
        let err = env.into_result().unwrap_err();
        assert!(err.is_business());
        assert_eq!(err.to_string(), "bad input(E1)");
    }

    #[test]
    fn any_non_ok_status_is_a_failure() {
        let env: Envelope<Point> = decode_envelope(
            r#"{"statusCode":"NOT_FOUND","responseData":{"errCode":"E404","errDesc":"no note"}}"#,
        )
        .unwrap();
        assert!(!env.is_success());
    }

    #[test]
    fn status_is_case_sensitive() {
        let env: Envelope<Point> =
            decode_envelope(r#"{"statusCode":"ok","responseData":{"errCode":"E","errDesc":"d"}}"#)
                .unwrap();
        assert!(matches!(env, Envelope::Failure(_)));
    }

    #[test]
    fn malformed_body_is_fatal_not_business() {
        let err = decode_envelope::<Point>("not json").unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
        assert!(!err.is_business());
    }

    #[test]
    fn missing_status_is_fatal() {
        let err = decode_envelope::<Point>(r#"{"responseData":{"x":1}}"#).unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn non_string_status_is_fatal() {
        let err =
            decode_envelope::<Point>(r#"{"statusCode":200,"responseData":{"x":1}}"#).unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn non_object_body_is_fatal() {
        let err = decode_envelope::<Point>("[1,2,3]").unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn payload_shape_mismatch_is_fatal() {
        let err =
            decode_envelope::<Point>(r#"{"statusCode":"OK","responseData":{"y":1}}"#).unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn failure_without_error_fields_is_fatal() {
        let err = decode_envelope::<Point>(r#"{"statusCode":"ERROR"}"#).unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn missing_data_suits_unit_payload() {
        let env: Envelope<()> = decode_envelope(r#"{"statusCode":"OK"}"#).unwrap();
        assert_eq!(env, Envelope::Success { payload: () });
    }

    #[test]
    fn extra_fields_are_ignored() {
        let env: Envelope<Point> =
            decode_envelope(r#"{"statusCode":"OK","responseData":{"x":3},"serverTime":12}"#)
                .unwrap();
        assert_eq!(env.into_result().unwrap(), Point { x: 3 });
    }
}

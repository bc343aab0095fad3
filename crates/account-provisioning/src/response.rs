//! Mapping of provisioning results onto the HTTP response contract.

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::service::ProvisionOutcome;
use serde::Serialize;
use tracing::error;

const ALREADY_REGISTERED: &str = "Account is already registered";
const GENERIC_FAILURE: &str = "An unexpected error occurred";

/// Error category carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    InvalidRequestError,
    CustomApiError,
    ApiError,
}

/// Success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedAccount {
    pub account_id: String,
    pub namespace_id: String,
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Provisioned(ProvisionedAccount),
    Error(ApiErrorBody),
}

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    fn error(status: u16, error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Error(ApiErrorBody {
                message: message.into(),
                error_type,
            }),
        }
    }

    pub fn from_result(result: &ProvisioningResult<ProvisionOutcome>) -> Self {
        match result {
            Ok(ProvisionOutcome::Created { account, namespace }) => Self {
                status: 201,
                body: ResponseBody::Provisioned(ProvisionedAccount {
                    account_id: account.public_id.clone(),
                    namespace_id: namespace.public_id.clone(),
                }),
            },
            Ok(ProvisionOutcome::AlreadyProvisioned { .. }) => {
                Self::error(400, ErrorType::InvalidRequestError, ALREADY_REGISTERED)
            }
            Err(e) => Self::from_error(e),
        }
    }

    pub fn from_error(err: &ProvisioningError) -> Self {
        match err {
            ProvisioningError::Validation(msg) => {
                Self::error(400, ErrorType::InvalidRequestError, msg.clone())
            }
            ProvisioningError::AccountNotFound(_) => {
                Self::error(404, ErrorType::InvalidRequestError, err.to_string())
            }
            ProvisioningError::VerificationFailed(_) => {
                Self::error(422, ErrorType::CustomApiError, err.to_string())
            }
            ProvisioningError::Upstream(_) | ProvisioningError::NotSupported(_) => {
                Self::error(500, ErrorType::CustomApiError, err.to_string())
            }
            ProvisioningError::Store(_) | ProvisioningError::Json(_) => {
                error!(error = %err, "Provisioning failed");
                Self::error(500, ErrorType::ApiError, GENERIC_FAILURE)
            }
        }
    }

    pub fn to_json(&self) -> ProvisioningResult<String> {
        Ok(serde_json::to_string(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use outbox_notifier::{Account, DirectoryError, Namespace};

    fn account() -> Account {
        Account {
            id: 1,
            public_id: "acc1".to_string(),
            email_address: "ada@example.com".to_string(),
            provider: "generic".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_created_is_201_with_ids() {
        let outcome = ProvisionOutcome::Created {
            account: account(),
            namespace: Namespace {
                id: 2,
                public_id: "ns2".to_string(),
                account: None,
            },
        };
        let resp = ApiResponse::from_result(&Ok(outcome));

        assert_eq!(resp.status, 201);
        assert_eq!(
            resp.to_json().unwrap(),
            r#"{"account_id":"acc1","namespace_id":"ns2"}"#
        );
    }

    #[test]
    fn test_already_provisioned_is_400() {
        let resp = ApiResponse::from_result(&Ok(ProvisionOutcome::AlreadyProvisioned {
            account: account(),
            namespace: None,
        }));

        assert_eq!(resp.status, 400);
        assert_eq!(
            resp.to_json().unwrap(),
            r#"{"message":"Account is already registered","type":"invalid_request_error"}"#
        );
    }

    #[test]
    fn test_error_mapping() {
        let cases = [
            (ProvisioningError::Validation("bad".into()), 400, ErrorType::InvalidRequestError),
            (
                ProvisioningError::AccountNotFound("ada@example.com".into()),
                404,
                ErrorType::InvalidRequestError,
            ),
            (ProvisioningError::VerificationFailed("x".into()), 422, ErrorType::CustomApiError),
            (ProvisioningError::Upstream("invalid_grant".into()), 500, ErrorType::CustomApiError),
            (
                ProvisioningError::Store(DirectoryError::Unavailable("down".into())),
                500,
                ErrorType::ApiError,
            ),
        ];

        for (err, status, error_type) in cases {
            let resp = ApiResponse::from_error(&err);
            assert_eq!(resp.status, status, "{}", err);
            match resp.body {
                ResponseBody::Error(body) => assert_eq!(body.error_type, error_type),
                ResponseBody::Provisioned(_) => panic!("expected error body"),
            }
        }
    }

    #[test]
    fn test_upstream_message_is_passed_through() {
        let resp = ApiResponse::from_error(&ProvisioningError::Upstream("invalid_grant".into()));
        assert_eq!(
            resp.to_json().unwrap(),
            r#"{"message":"Internal error: invalid_grant","type":"custom_api_error"}"#
        );
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let resp = ApiResponse::from_error(&ProvisioningError::Store(DirectoryError::Unavailable(
            "password=hunter2".into(),
        )));
        let json = resp.to_json().unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains(GENERIC_FAILURE));
    }
}

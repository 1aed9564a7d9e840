//! Turns a completed request/response pair into a payload or a
//! [`ApiFailure`].
//!
//! The remote API reports failures in two shapes, sometimes both at once:
//!
//! ```text
//! {"error": {"error_code": 14, "error_msg": "Captcha needed", "captcha_sid": "..."}}
//! {"error": "need_validation", "error_description": "...", "validation_type": "2fa_sms"}
//! ```
//!
//! Classification follows a fixed priority: captcha, then the validation
//! family, then redirect, then a generic failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::foundation::{ApiFailure, ApiRequest, ApiResponse, FailureKind};

/// Sentinels and codes that select a failure category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Top-level `error` value that marks a captcha challenge.
    pub captcha_sentinel: String,
    /// Nested `error_code` that marks a captcha challenge.
    pub captcha_code: i64,
    /// Top-level `error` value that marks the validation family.
    pub validation_sentinel: String,
    /// Nested `error_code` that marks a redirect.
    pub redirect_code: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            captcha_sentinel: "need_captcha".to_string(),
            captcha_code: 14,
            validation_sentinel: "need_validation".to_string(),
            redirect_code: 17,
        }
    }
}

/// Stateless response classifier.
#[derive(Debug, Clone, Default)]
pub struct ResponseClassifier {
    config: ClassifierConfig,
}

/// The error-bearing parts of a response body.
struct ErrorView<'a> {
    body: &'a Map<String, Value>,
    nested: Option<&'a Map<String, Value>>,
    marker: Option<&'a str>,
}

impl<'a> ErrorView<'a> {
    fn new(body: &'a Map<String, Value>) -> Self {
        let error = body.get("error");
        Self {
            body,
            nested: error.and_then(Value::as_object),
            marker: error.and_then(Value::as_str),
        }
    }

    /// Looks a field up in the nested error first, then at the top level.
    fn field(&self, name: &str) -> Option<&'a Value> {
        self.nested
            .and_then(|nested| nested.get(name))
            .or_else(|| self.body.get(name))
            .filter(|v| !v.is_null())
    }

    fn string(&self, name: &str) -> Option<String> {
        self.field(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    fn code(&self) -> i64 {
        self.nested
            .and_then(|nested| nested.get("error_code"))
            .and_then(|code| {
                code.as_i64()
                    .or_else(|| code.as_str().and_then(|s| s.parse().ok()))
            })
            .unwrap_or(0)
    }

    fn message(&self) -> String {
        let mut message = self
            .nested
            .and_then(|nested| nested.get("message").or_else(|| nested.get("error_msg")))
            .and_then(Value::as_str);
        // The top-level description overrides the nested message when both
        // are present.
        if let Some(description) = self.body.get("error_description").and_then(Value::as_str) {
            message = Some(description);
        }
        message
            .or(self.marker)
            .unwrap_or("Unknown error")
            .to_string()
    }

    fn subtype(&self) -> Option<String> {
        self.body
            .get("error_type")
            .and_then(Value::as_str)
            .or(self.marker)
            .map(str::to_string)
    }
}

impl ResponseClassifier {
    /// Creates a classifier using `config`.
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies `response`, returning the unwrapped payload on success.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiFailure`] whenever the body is not a JSON object or
    /// carries an `error` marker.
    pub fn classify(&self, response: &ApiResponse, request: &ApiRequest) -> Result<Value, ApiFailure> {
        let Some(body) = response.body.as_object() else {
            debug!(method = %request.method, "Response body is not structured data");
            return Err(ApiFailure {
                kind: FailureKind::MalformedResponse {
                    raw_body: response.body.raw(),
                },
                code: 0,
                message: "Response body is not structured data".to_string(),
                subtype: None,
                request: request.clone(),
                response: response.clone(),
            });
        };

        if body.get("error").is_none_or(Value::is_null) {
            return Ok(body
                .get("response")
                .cloned()
                .unwrap_or_else(|| Value::Object(body.clone())));
        }

        let view = ErrorView::new(body);
        let code = view.code();
        let kind = self.discriminate(&view, code);

        let failure = ApiFailure {
            kind,
            code,
            message: view.message(),
            subtype: view.subtype(),
            request: request.clone(),
            response: response.clone(),
        };
        debug!(
            method = %request.method,
            category = %failure.category(),
            code = failure.code,
            "Classified API failure"
        );
        Err(failure)
    }

    fn discriminate(&self, view: &ErrorView<'_>, code: i64) -> FailureKind {
        let marker = view.marker;

        if marker == Some(self.config.captcha_sentinel.as_str()) || code == self.config.captcha_code {
            return FailureKind::CaptchaRequired {
                sid: view.string("captcha_sid"),
                image_url: view.string("captcha_img"),
            };
        }

        if marker == Some(self.config.validation_sentinel.as_str()) {
            if let Some(ban_info) = view.field("ban_info") {
                return FailureKind::UserBanned {
                    ban_info: ban_info.clone(),
                    redirect_uri: view.string("redirect_uri"),
                };
            }
            if let Some(validation_type) = view.string("validation_type") {
                return FailureKind::ValidationRequired {
                    validation_type,
                    phone_mask: view.string("phone_mask"),
                    redirect_uri: view.string("redirect_uri"),
                    validation_sid: view.string("validation_sid"),
                };
            }
            return FailureKind::GenericValidationRequired;
        }

        if code == self.config.redirect_code {
            return FailureKind::RedirectRequired {
                redirect_uri: view.string("redirect_uri"),
            };
        }

        FailureKind::Generic
    }
}

//! Structured failures produced by the response classifier.

use std::fmt;

use serde_json::Value;

use super::category::Category;
use super::request::{ApiRequest, ApiResponse};

/// Category-specific detail of a structured failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// Any other API error.
    Generic,
    /// A captcha must be solved before the call can succeed.
    CaptchaRequired {
        /// Captcha identifier to send back with the answer.
        sid: Option<String>,
        /// Location of the captcha image.
        image_url: Option<String>,
    },
    /// The account needs validation; the API gave no further detail.
    GenericValidationRequired,
    /// The account needs a specific kind of validation.
    ValidationRequired {
        /// Validation kind (e.g. `"2fa_sms"`).
        validation_type: String,
        /// Masked phone number the code was sent to.
        phone_mask: Option<String>,
        /// Where the user can complete validation.
        redirect_uri: Option<String>,
        /// Validation session identifier.
        validation_sid: Option<String>,
    },
    /// The account is banned.
    UserBanned {
        /// Ban details exactly as reported by the API.
        ban_info: Value,
        /// Where the user can read about the ban.
        redirect_uri: Option<String>,
    },
    /// The call must be repeated at another location.
    RedirectRequired {
        /// Target location.
        redirect_uri: Option<String>,
    },
    /// The body was not structured data.
    MalformedResponse {
        /// The body as received.
        raw_body: String,
    },
}

impl FailureKind {
    /// Returns the category this variant is registered under.
    pub fn category(&self) -> Category {
        match self {
            Self::Generic => Category::Api,
            Self::CaptchaRequired { .. } => Category::Captcha,
            Self::GenericValidationRequired => Category::Validation,
            Self::ValidationRequired { .. } => Category::ValidationRequired,
            Self::UserBanned { .. } => Category::UserBanned,
            Self::RedirectRequired { .. } => Category::Redirect,
            Self::MalformedResponse { .. } => Category::MalformedResponse,
        }
    }
}

/// A failed API call, classified.
///
/// Carries the category-specific [`FailureKind`], the error code and message
/// extracted from the response, and the original request/response pair for
/// diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    /// Category-specific detail.
    pub kind: FailureKind,
    /// Numeric error code (`0` when the API did not send one).
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Error subtype tag as sent by the API.
    pub subtype: Option<String>,
    /// The request that failed.
    pub request: ApiRequest,
    /// The response that was classified.
    pub response: ApiResponse,
}

impl ApiFailure {
    /// Returns the category of this failure.
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Returns `true` if this failure falls under `category`.
    pub fn is(&self, category: Category) -> bool {
        self.category().is_a(category)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failure in {} (code {}): {}",
            self.category(),
            self.request.method,
            self.code,
            self.message
        )?;
        if let Some(subtype) = &self.subtype {
            write!(f, " [{subtype}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiFailure {}

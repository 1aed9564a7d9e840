//! Foundation layer: the values that flow through an API call.

pub mod category;
pub mod error;
pub mod failure;
pub mod request;

pub use category::Category;
pub use error::{
    ApiError, ApiResult, ComposerError, SessionError, SessionResult, TransportError,
    TransportResult,
};
pub use failure::{ApiFailure, FailureKind};
pub use request::{ApiRequest, ApiResponse, CallContext, HttpMethod, ResponseBody};

//! Dispatch layer: middleware pipelines, recovery handlers and response
//! classification.

pub mod classifier;
pub mod composer;
pub mod exception;

pub use classifier::{ClassifierConfig, ResponseClassifier};
pub use composer::{ComposerStack, Middleware, Next, middleware};
pub use exception::{ExceptionHandler, ExceptionRegistry, HandlerHandle, Recovery, exception_handler};

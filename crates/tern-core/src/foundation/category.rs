//! Exception categories and their declared ancestry.
//!
//! Categories form a closed hierarchy rooted at [`Category::Any`]:
//!
//! ```text
//! Any
//! ├── Api
//! │   ├── Captcha
//! │   ├── Validation
//! │   │   ├── ValidationRequired
//! │   │   └── UserBanned
//! │   └── Redirect
//! └── MalformedResponse
//! ```
//!
//! A handler registered for a broad category also sees failures of every
//! category below it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A nominal failure type used to key recovery handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Root of the hierarchy; matches every failure.
    Any,
    /// Any error reported by the remote API. Generic failures use this tag.
    Api,
    /// The API asks the user to solve a captcha.
    Captcha,
    /// The account needs validation; no further detail was given.
    Validation,
    /// The account needs validation of a specific kind (e.g. phone).
    ValidationRequired,
    /// The account is banned.
    UserBanned,
    /// The call must be retried at another location.
    Redirect,
    /// The response body was not structured data.
    MalformedResponse,
}

impl Category {
    /// Every category, parents before children.
    pub const ALL: [Category; 8] = [
        Category::Any,
        Category::Api,
        Category::Captcha,
        Category::Validation,
        Category::ValidationRequired,
        Category::UserBanned,
        Category::Redirect,
        Category::MalformedResponse,
    ];

    /// Returns the declared parent, or `None` for [`Category::Any`].
    pub const fn parent(self) -> Option<Category> {
        match self {
            Self::Any => None,
            Self::Api | Self::MalformedResponse => Some(Self::Any),
            Self::Captcha | Self::Validation | Self::Redirect => Some(Self::Api),
            Self::ValidationRequired | Self::UserBanned => Some(Self::Validation),
        }
    }

    /// Iterates `self` followed by every ancestor up to the root.
    pub fn lineage(self) -> impl Iterator<Item = Category> {
        std::iter::successors(Some(self), |c| c.parent())
    }

    /// Returns `true` if `self` is `ancestor` or one of its descendants.
    pub fn is_a(self, ancestor: Category) -> bool {
        self.lineage().any(|c| c == ancestor)
    }

    /// Returns the category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Api => "api",
            Self::Captcha => "captcha",
            Self::Validation => "validation",
            Self::ValidationRequired => "validation_required",
            Self::UserBanned => "user_banned",
            Self::Redirect => "redirect",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

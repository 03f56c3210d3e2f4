use std::fmt::{self, Display};

use serde::Serialize;
use thiserror::Error;
use warp::reject::Reject;

use crate::schema::{Id, MembershipKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    Other,
}

#[derive(Debug)]
pub struct QueryError {
    kind: QueryErrorKind,
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: QueryErrorKind::Other,
            info,
        }
    }

    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }

    pub fn is_unique_violation(&self) -> bool {
        self.kind == QueryErrorKind::UniqueViolation
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.kind == QueryErrorKind::ForeignKeyViolation
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let kind = if e.is_unique_violation() {
                    QueryErrorKind::UniqueViolation
                } else if e.is_foreign_key_violation() {
                    QueryErrorKind::ForeignKeyViolation
                } else {
                    QueryErrorKind::Other
                };
                Self {
                    kind,
                    info: format!("{e}"),
                }
            }
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for QueryError {}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

/// A single rejected property of a recipe submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("At least one tag is required")]
    EmptyTags,
    #[error("Tag {tag_id} is listed more than once")]
    DuplicateTag { tag_id: Id },
    #[error("Tag {tag_id} does not exist")]
    UnknownTag { tag_id: Id },
    #[error("At least one ingredient is required")]
    EmptyIngredients,
    #[error("Ingredient {ingredient_id} is listed more than once")]
    DuplicateIngredient { ingredient_id: Id },
    #[error("Ingredient {ingredient_id} does not exist")]
    UnknownIngredient { ingredient_id: Id },
    #[error("Amount of ingredient {ingredient_id} must be greater than 0 (got {amount})")]
    NonPositiveAmount { ingredient_id: Id, amount: i64 },
    #[error("Cooking time must be between 1 and 999 minutes (got {cooking_time})")]
    CookingTimeOutOfRange { cooking_time: i64 },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyTags
            | ValidationError::DuplicateTag { .. }
            | ValidationError::UnknownTag { .. } => "tags",
            ValidationError::EmptyIngredients
            | ValidationError::DuplicateIngredient { .. }
            | ValidationError::UnknownIngredient { .. }
            | ValidationError::NonPositiveAmount { .. } => "ingredients",
            ValidationError::CookingTimeOutOfRange { .. } => "cooking_time",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid recipe ({} problems)", .0.len())]
    Validation(Vec<ValidationError>),

    #[error("Recipe {recipe_id} is already in {kind}")]
    AlreadyExists { kind: MembershipKind, recipe_id: Id },

    #[error("Recipe {recipe_id} is not in {kind}")]
    NotFound { kind: MembershipKind, recipe_id: Id },

    #[error("You cannot subscribe to yourself")]
    SelfSubscription,

    #[error("Already subscribed to author {author_id}")]
    AlreadySubscribed { author_id: Id },

    #[error("Not subscribed to author {author_id}")]
    NotSubscribed { author_id: Id },

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("No recipe exists with id {0}")]
    RecipeNotFound(Id),

    #[error("No recipe is linked to short code {0:?}")]
    ShortLinkNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Could not find a free short code for recipe {0}")]
    ShortLinkSpaceExhausted(Id),

    #[error("Total amount of ingredient {0} does not fit the shopping list")]
    AmountOverflow(Id),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Query failed: {0}")]
    Query(#[from] QueryError),
}

impl Error {
    pub fn code(&self) -> u16 {
        match self {
            Error::Validation(_)
            | Error::AlreadyExists { .. }
            | Error::NotFound { .. }
            | Error::SelfSubscription
            | Error::AlreadySubscribed { .. }
            | Error::NotSubscribed { .. }
            | Error::InvalidRequest(_) => 400,
            Error::Unauthorized => 401,
            Error::Forbidden => 403,
            Error::RecipeNotFound(_) | Error::ShortLinkNotFound(_) => 404,
            Error::Integrity(_)
            | Error::ShortLinkSpaceExhausted(_)
            | Error::AmountOverflow(_)
            | Error::Export(_)
            | Error::Query(_) => 500,
        }
    }

    /// Stable machine-readable name of the error class.
    pub fn name(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::AlreadyExists { .. } => "already_exists",
            Error::NotFound { .. } => "not_found",
            Error::SelfSubscription => "self_subscription",
            Error::AlreadySubscribed { .. } => "already_subscribed",
            Error::NotSubscribed { .. } => "not_subscribed",
            Error::Forbidden => "forbidden",
            Error::Unauthorized => "unauthorized",
            Error::RecipeNotFound(_) => "recipe_not_found",
            Error::ShortLinkNotFound(_) => "short_link_not_found",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Integrity(_) => "integrity",
            Error::ShortLinkSpaceExhausted(_) => "short_link_space_exhausted",
            Error::AmountOverflow(_) => "amount_overflow",
            Error::Export(_) => "export",
            Error::Query(_) => "query",
        }
    }

    /// Maps a storage failure that happened while rewriting a recipe's composition.
    /// Constraint violations there mean validation let something through.
    pub fn integrity(value: sqlx::Error) -> Self {
        let e = QueryError::from(value);
        match e.kind() {
            QueryErrorKind::UniqueViolation | QueryErrorKind::ForeignKeyViolation => {
                log::error!("Constraint violated while writing a recipe: {e}");
                Error::Integrity(e.info)
            }
            QueryErrorKind::Other => Error::Query(e),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        Error::Query(QueryError::from(value))
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        Error::InvalidRequest(value.info)
    }
}

impl Reject for Error {}

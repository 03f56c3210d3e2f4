pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

// SQLITE_MAX_VARIABLE_NUMBER of the bundled sqlite
pub const MAX_BINDS_PER_STATEMENT: usize = 32766;

pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = 999;

pub const SHORT_LINK_LENGTH: usize = 6;
pub const SHORT_LINK_MAX_ATTEMPTS: u32 = 32;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_LIFETIME_HOURS: i64 = 1;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.csv";
pub const SHOPPING_LIST_HEADER: &[&str] = &["ingredient", "measurement_unit", "amount"];

pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 6;
pub const INGREDIENT_SEARCH_LIMIT: i64 = 50;

pub const RECIPE_NAME_MAX_LENGTH: usize = 64;
pub const TAG_FIELD_MAX_LENGTH: usize = 64;
pub const INGREDIENT_FIELD_MAX_LENGTH: usize = 64;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const SESSION_COOKIE: &str = "session";
pub const DEFAULT_SESSION_HOURS: i64 = 24;

pub const SHOPPING_LIST_FILE_NAME: &str = "shopping_list.txt";
pub const SHOPPING_LIST_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Query-string values accepted as `true` / `false` by list filters.
pub const TRUTHY_VALUES: &[&str] = &["1", "true"];
pub const FALSY_VALUES: &[&str] = &["0", "false"];

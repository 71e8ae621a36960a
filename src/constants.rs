pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const COOKING_TIME_MIN: i32 = 1;
pub const COOKING_TIME_MAX: i32 = 500;
pub const RECIPE_NAME_MAX_LENGTH: usize = 200;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const SHOPPING_LIST_TITLE: &str = "Shopping list";
pub const SHOPPING_LIST_FILE_NAME: &str = "ShoppingList";
pub const SHOPPING_LIST_LINES_PER_PAGE: usize = 26;

pub const SESSION_HEADER_PREFIX: &str = "Token ";
pub const DEFAULT_JWT_LIFETIME_HOURS: i64 = 24;

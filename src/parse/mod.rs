mod day_menu;
mod field;
mod home_page;
mod login_page;
mod selector;
mod whitespace;

pub use day_menu::{extract_menu, DayResponse, MenuTextPolicy};
pub use home_page::{extract_auth_context, AuthContext, CyclePolicy};
pub use login_page::extract_csrf_token;

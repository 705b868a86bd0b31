pub mod login_handler;
pub mod logout_handler;
pub mod refresh_handler;
pub mod register_handler;
pub mod userinfo_handler;

pub use login_handler::login;
pub use logout_handler::logout;
pub use refresh_handler::refresh;
pub use register_handler::register;
pub use userinfo_handler::get_user_info;

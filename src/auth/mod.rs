//! 管理员会话
//!
//! 登录后签发 HS256 令牌写入 `admin_token` cookie，管理接口与管理页面各有一个守卫中间件。

mod guard;
mod password;
mod session;

pub use self::{
    guard::{LOGIN_PAGE, require_admin_api, require_admin_page},
    password::{hash_password, verify_password, verify_password_async},
    session::{AdminSession, SESSION_COOKIE, SESSION_DAYS, SessionKeys},
};

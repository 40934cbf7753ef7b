//! 基础设施层：持有稀缺资源（HTTP 会话、浏览器页面），只暴露能力

pub mod http_session;
pub mod page_session;

pub use http_session::HttpSession;
pub use page_session::PageSession;

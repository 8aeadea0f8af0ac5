//! Data models

pub mod campaign;
pub mod click_log;
pub mod control;
pub mod employee;
pub mod leak;
pub mod organization;
pub mod target;
pub mod template;

pub use campaign::*;
pub use click_log::*;
pub use control::*;
pub use employee::*;
pub use leak::*;
pub use organization::*;
pub use target::*;
pub use template::*;

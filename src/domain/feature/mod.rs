//! Feature Context - 后端作业目录
//!
//! 职责:
//! - 各作业的提交/状态/停止/刷新端点
//! - 鉴权方式与请求参数

mod value_objects;

pub use value_objects::{AuthScheme, ClearScope, TaskFeature, WecomCredentials};

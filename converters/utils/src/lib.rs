//! 转换工具依赖的通用组件.

pub mod loader;

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("--------------------------------------------------------");
}

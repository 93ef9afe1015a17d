//! 通用宏

/// 以字段列表的形式为配置结构体实现 `Default`
///
/// ```rust
/// use stride_anim::impl_default;
///
/// struct Limits {
///     iterations: u32,
///     threshold: f32,
/// }
///
/// impl_default!(Limits {
///     iterations: 15,
///     threshold: 1e-5,
/// });
///
/// assert_eq!(Limits::default().iterations, 15);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}

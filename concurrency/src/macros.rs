// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

/// Compile the enclosed items only when the *concurrency* crate is built with `shuttle`.
///
/// # Example
/// ```
/// # use bih_concurrency::with_shuttle;
/// with_shuttle! {
///     fn only_compiled_with_shuttle() {}
/// }
/// ```
#[cfg(feature = "shuttle")]
#[macro_export]
macro_rules! with_shuttle {
    ($($item:item)*) => {
        $(
            $item
        )*
    };
}

#[cfg(not(feature = "shuttle"))]
#[macro_export]
macro_rules! with_shuttle {
    ($($item:item)*) => {};
}

/// Compile the enclosed items only when the *concurrency* crate uses `std` primitives.
///
/// # Example
/// ```
/// # use bih_concurrency::with_std;
/// with_std! {
///     fn only_compiled_with_std() {}
/// }
/// ```
#[cfg(not(feature = "shuttle"))]
#[macro_export]
macro_rules! with_std {
    ($($item:item)*) => {
        $(
            $item
        )*
    };
}

#[cfg(feature = "shuttle")]
#[macro_export]
macro_rules! with_std {
    ($($item:item)*) => {};
}

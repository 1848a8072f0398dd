//! Macro for implementing string conversions on status enums
//!
//! Status enums are persisted as lowercase snake_case strings inside the job
//! blob and shown in logs. This macro keeps `Display`, `FromStr` and
//! `as_str` in one mapping so the three can never drift apart.
//!
//! # Example
//!
//! ```rust
//! use fieldsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum UploadStatus {
//!     Queued,
//!     Uploading,
//!     Uploaded,
//! }
//!
//! impl_domain_status_conversions!(UploadStatus {
//!     Queued => "queued",
//!     Uploading => "uploading",
//!     Uploaded => "uploaded",
//! });
//!
//! assert_eq!(UploadStatus::Uploading.as_str(), "uploading");
//! assert_eq!("UPLOADED".parse::<UploadStatus>(), Ok(UploadStatus::Uploaded));
//! ```

/// Implements `as_str`, `Display` and `FromStr` for status enums
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their string
///   representations
///
/// Parsing is case-insensitive; output always uses the mapped string.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable string form used in persisted records and logs
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => ::core::result::Result::Ok(Self::$variant),)+
                    _ => ::core::result::Result::Err(::std::format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

//! Macro for implementing Display and FromStr for label enums
//!
//! Queue priorities, operation kinds, HTTP verbs and dataset kinds all travel
//! as short labels (in persisted JSON, log fields and configuration). This
//! macro keeps the string mapping for those enums in one place.
//!
//! # Example
//!
//! ```rust
//! use fieldsync_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Band {
//!     Front,
//!     Back,
//! }
//!
//! impl_label_conversions!(Band {
//!     Front => "front",
//!     Back => "back",
//! });
//!
//! assert_eq!(Band::Front.as_str(), "front");
//! assert_eq!(Band::Front.to_string(), "front");
//! assert_eq!("BACK".parse::<Band>().unwrap(), Band::Back);
//! ```

/// Implements `as_str`, Display and FromStr for a fieldless enum.
///
/// Labels are written out exactly as given, in whatever case the wire format
/// uses; parsing ignores ASCII case and surrounding whitespace.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Wire label for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::FieldSyncError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let label = s.trim();
                $(
                    if label.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err($crate::FieldSyncError::InvalidInput(format!(
                    "Invalid {}: {}",
                    stringify!($enum_name),
                    s
                )))
            }
        }
    };
}

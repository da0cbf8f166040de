//! Macro for implementing Display and FromStr for wire-level enums
//!
//! The warehouse API spells enum values in upper case (`PENDING`,
//! `WRITE_TRUNCATE`, `NEWLINE_DELIMITED_JSON`). This macro gives an enum a
//! single mapping used for both `Display` and case-insensitive `FromStr`.
//!
//! # Example
//!
//! ```rust
//! use tabula_domain::impl_wire_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Priority {
//!     Interactive,
//!     Batch,
//! }
//!
//! impl_wire_enum_conversions!(Priority {
//!     Interactive => "INTERACTIVE",
//!     Batch => "BATCH",
//! });
//!
//! assert_eq!(Priority::Batch.to_string(), "BATCH");
//! assert_eq!("interactive".parse::<Priority>().unwrap(), Priority::Interactive);
//! ```

/// Implements Display and FromStr traits for wire-level enums
///
/// This macro generates:
/// - Display trait: writes the canonical wire spelling
/// - FromStr trait: parses the wire spelling, ignoring ASCII case
///
/// # Arguments
///
/// * `$enum_name` - The name of the enum type
/// * `$variant => $str` - Mapping of enum variants to their wire spelling
#[macro_export]
macro_rules! impl_wire_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical wire spelling of this value.
            pub const fn as_str(&self) -> &'static str {
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
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestDisposition {
        Truncate,
        Append,
        Empty,
    }

    impl_wire_enum_conversions!(TestDisposition {
        Truncate => "WRITE_TRUNCATE",
        Append => "WRITE_APPEND",
        Empty => "WRITE_EMPTY",
    });

    #[test]
    fn test_display_uses_wire_spelling() {
        assert_eq!(TestDisposition::Truncate.to_string(), "WRITE_TRUNCATE");
        assert_eq!(TestDisposition::Append.to_string(), "WRITE_APPEND");
        assert_eq!(TestDisposition::Empty.as_str(), "WRITE_EMPTY");
    }

    #[test]
    fn test_fromstr_ignores_case() {
        assert_eq!(TestDisposition::from_str("WRITE_APPEND").unwrap(), TestDisposition::Append);
        assert_eq!(TestDisposition::from_str("write_empty").unwrap(), TestDisposition::Empty);
        assert_eq!(
            TestDisposition::from_str("Write_Truncate").unwrap(),
            TestDisposition::Truncate
        );
    }

    #[test]
    fn test_fromstr_invalid() {
        let err = TestDisposition::from_str("WRITE_SOMETIMES").unwrap_err();
        assert!(err.contains("TestDisposition"));
        assert!(err.contains("WRITE_SOMETIMES"));
    }
}

//! Type-safe identifier wrappers around [`String`].
//!
//! Every identifier that travels on the wire is a plain string
//! (`"User_12"`, `"SHOP_3"`, `"SKU_481"`, a 32-char hex session id), but the
//! simulation never mixes them up: each one gets its own newtype so the
//! compiler rejects passing a client id where a shop id is expected.
//!
//! The wrappers serialize transparently, so payloads keep the flat string
//! shape downstream consumers expect.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing string value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }
    };
}

define_id! {
    /// Unique identifier for one shopping session (hex-encoded 128-bit value).
    SessionId
}

define_id! {
    /// Shopper identifier, derived from the session id (`User_<n>`).
    ClientId
}

define_id! {
    /// Shop identifier, derived from the reversed session id (`SHOP_<n>`).
    ShopId
}

define_id! {
    /// Stock keeping unit identifier (`SKU_<n>`).
    Sku
}

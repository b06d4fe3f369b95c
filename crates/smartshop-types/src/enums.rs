//! Enumeration types shared between the simulation and the sink adapters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status carried by a check-in or check-out event.
///
/// On the wire this is a signed integer: `1` for check-in, `-1` for
/// check-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// The shopper entered the store and a session was opened.
    CheckIn,
    /// The shopper left the store and the session was closed.
    CheckOut,
}

impl SessionStatus {
    /// Integer code used on the wire.
    pub const fn code(self) -> i8 {
        match self {
            Self::CheckIn => 1,
            Self::CheckOut => -1,
        }
    }

    /// Parse a wire code back into a status.
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            1 => Some(Self::CheckIn),
            -1 => Some(Self::CheckOut),
            _ => None,
        }
    }

    /// Topic a status event with this value is published to.
    pub const fn topic(self) -> Topic {
        match self {
            Self::CheckIn => Topic::Checkin,
            Self::CheckOut => Topic::Checkout,
        }
    }
}

impl Serialize for SessionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.code())
    }
}

impl<'de> Deserialize<'de> for SessionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i8::deserialize(deserializer)?;
        Self::from_code(code).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown session status code: {code}"))
        })
    }
}

/// Logical destination of an emitted event.
///
/// The sink adapter maps each topic to a concrete subject name taken from
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// Basket delta events.
    Basket,
    /// Session check-in events.
    Checkin,
    /// Session check-out events.
    Checkout,
}

impl Topic {
    /// All topics, in a stable order.
    pub const ALL: [Self; 3] = [Self::Basket, Self::Checkin, Self::Checkout];

    /// Lowercase topic name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basket => "basket",
            Self::Checkin => "checkin",
            Self::Checkout => "checkout",
        }
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        assert_eq!(SessionStatus::from_code(1), Some(SessionStatus::CheckIn));
        assert_eq!(SessionStatus::from_code(-1), Some(SessionStatus::CheckOut));
        assert_eq!(SessionStatus::from_code(0), None);
    }

    #[test]
    fn status_serializes_as_integer() {
        let json = serde_json::to_string(&SessionStatus::CheckOut).ok();
        assert_eq!(json.as_deref(), Some("-1"));
    }

    #[test]
    fn unknown_status_code_is_rejected() {
        let parsed = serde_json::from_str::<SessionStatus>("2");
        assert!(parsed.is_err());
    }

    #[test]
    fn status_maps_to_topic() {
        assert_eq!(SessionStatus::CheckIn.topic(), Topic::Checkin);
        assert_eq!(SessionStatus::CheckOut.topic(), Topic::Checkout);
    }
}

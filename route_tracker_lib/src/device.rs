use std::{fmt, str::FromStr};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 8 random bytes, hex encoded.
    pub fn random() -> Self {
        let bytes: [u8; 8] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tracker devices produce samples, display devices consume and render them.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Tracker,
    Display,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Tracker => f.write_str("tracker"),
            Role::Display => f.write_str("display"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tracker" => Ok(Role::Tracker),
            "display" => Ok(Role::Display),
            other => Err(format!("Unknown role '{other}', expected tracker or display")),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_hex_and_distinct() {
        let a = DeviceId::random();
        let b = DeviceId::random();
        assert_eq!(a.as_str().len(), 16);
        assert!(hex::decode(a.as_str()).is_ok());
        assert_ne!(a, b);
    }

    #[test]
    fn role_parsing() {
        assert_eq!("Tracker".parse::<Role>(), Ok(Role::Tracker));
        assert_eq!(" display ".parse::<Role>(), Ok(Role::Display));
        assert!("viewer".parse::<Role>().is_err());
        assert_eq!(Role::Display.to_string(), "display");
    }
}

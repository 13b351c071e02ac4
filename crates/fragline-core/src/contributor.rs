//! Detector subsystem tags.
//!
//! A [`Contributor`] identifies which subsystem produced a fragment. The set
//! is closed: Tracker, HCal, ECal. On the TCP wire the tag travels as a
//! `u64` (`0`, `1`, `2`); the raw-capture format uses a different tag space
//! (`20`, `30`) which `fragline-capture` bridges explicitly.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A detector subsystem producing fragments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u64)]
pub enum Contributor {
    Tracker = 0,
    Hcal = 1,
    Ecal = 2,
}

impl Contributor {
    /// Every subsystem, in tag order. A complete event covers all of these.
    pub const ALL: [Contributor; 3] = [Contributor::Tracker, Contributor::Hcal, Contributor::Ecal];

    /// The tag carried on the TCP wire.
    pub fn as_u64(self) -> u64 {
        self as u64
    }
}

impl TryFrom<u64> for Contributor {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Contributor::Tracker),
            1 => Ok(Contributor::Hcal),
            2 => Ok(Contributor::Ecal),
            other => Err(Error::UnknownContributor(other)),
        }
    }
}

impl std::fmt::Display for Contributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Contributor::Tracker => "Tracker",
            Contributor::Hcal => "Hcal",
            Contributor::Ecal => "Ecal",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags_are_stable() {
        assert_eq!(Contributor::Tracker.as_u64(), 0);
        assert_eq!(Contributor::Hcal.as_u64(), 1);
        assert_eq!(Contributor::Ecal.as_u64(), 2);
    }

    #[test]
    fn test_try_from_round_trip() {
        for c in Contributor::ALL {
            assert_eq!(Contributor::try_from(c.as_u64()).unwrap(), c);
        }
    }

    #[test]
    fn test_try_from_rejects_unknown() {
        let err = Contributor::try_from(3).unwrap_err();
        assert!(matches!(err, Error::UnknownContributor(3)));
        assert!(Contributor::try_from(20).is_err());
        assert!(Contributor::try_from(u64::MAX).is_err());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Contributor::Tracker.to_string(), "Tracker");
        assert_eq!(Contributor::Hcal.to_string(), "Hcal");
        assert_eq!(Contributor::Ecal.to_string(), "Ecal");
    }

    #[test]
    fn test_all_covers_every_variant() {
        assert_eq!(Contributor::ALL.len(), 3);
        for tag in 0..3u64 {
            assert!(Contributor::ALL
                .iter()
                .any(|c| c.as_u64() == tag));
        }
    }

    #[test]
    fn test_serde_round_trip() {
        for c in Contributor::ALL {
            let json = serde_json::to_string(&c).expect("serialize");
            let back: Contributor = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, c);
        }
    }
}

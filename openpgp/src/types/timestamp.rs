//! Wire-format time representations.

use std::convert::TryFrom;
use std::fmt;
use std::time::{SystemTime, Duration as SystemDuration, UNIX_EPOCH};

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::{
    Error,
    Result,
};

/// A timestamp representable by OpenPGP.
///
/// OpenPGP timestamps are represented as `u32` containing the number
/// of seconds elapsed since midnight, 1 January 1970 UTC ([Section
/// 3.5 of RFC 4880]).
///
/// They cannot express dates further in the future than 7 February
/// 2106, nor dates before the UNIX epoch.
///
///   [Section 3.5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-3.5
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub struct Timestamp(u32);
assert_send_and_sync!(Timestamp);

impl From<Timestamp> for u32 {
    fn from(t: Timestamp) -> Self {
        t.0
    }
}

impl From<u32> for Timestamp {
    fn from(t: u32) -> Self {
        Timestamp(t)
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = anyhow::Error;

    fn try_from(t: SystemTime) -> Result<Self> {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) if d.as_secs() <= u32::MAX as u64 =>
                Ok(Timestamp(d.as_secs() as u32)),
            _ => Err(Error::InvalidArgument(
                format!("Time exceeds u32 epoch: {:?}", t)).into()),
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(t: Timestamp) -> Self {
        UNIX_EPOCH + SystemDuration::new(t.0 as u64, 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", SystemTime::from(*self))
    }
}

impl Timestamp {
    /// Returns the current time.
    pub fn now() -> Timestamp {
        SystemTime::now().try_into()
            .expect("representable for the next hundred years")
    }

    /// Adds a duration to this timestamp.
    ///
    /// Returns `None` if the resulting timestamp is not
    /// representable.
    pub fn checked_add(&self, d: Duration) -> Option<Timestamp> {
        self.0.checked_add(d.0).map(Self)
    }

    /// Subtracts a duration from this timestamp.
    ///
    /// Returns `None` if the resulting timestamp is not
    /// representable.
    pub fn checked_sub(&self, d: Duration) -> Option<Timestamp> {
        self.0.checked_sub(d.0).map(Self)
    }
}

#[cfg(test)]
impl Arbitrary for Timestamp {
    fn arbitrary(g: &mut Gen) -> Self {
        Timestamp(u32::arbitrary(g))
    }
}

/// A duration representable by OpenPGP.
///
/// OpenPGP durations are `u32`s containing a number of seconds; they
/// cannot express durations longer than about 136 years.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub struct Duration(u32);
assert_send_and_sync!(Duration);

impl From<Duration> for u32 {
    fn from(d: Duration) -> Self {
        d.0
    }
}

impl From<u32> for Duration {
    fn from(d: u32) -> Self {
        Duration(d)
    }
}

impl TryFrom<SystemDuration> for Duration {
    type Error = anyhow::Error;

    fn try_from(d: SystemDuration) -> Result<Self> {
        if d.as_secs() <= u32::MAX as u64 {
            Ok(Duration(d.as_secs() as u32))
        } else {
            Err(Error::InvalidArgument(
                format!("Duration exceeds u32: {:?}", d)).into())
        }
    }
}

impl From<Duration> for SystemDuration {
    fn from(d: Duration) -> Self {
        SystemDuration::new(d.0 as u64, 0)
    }
}

impl Duration {
    /// Returns a `Duration` with the given number of seconds.
    pub fn seconds(n: u32) -> Duration {
        n.into()
    }

    /// Returns a `Duration` with the given number of days.
    pub fn days(n: u32) -> Result<Duration> {
         24u32.checked_mul(60 * 60)
            .and_then(|hours| hours.checked_mul(n))
            .ok_or_else(|| Error::InvalidArgument(
                format!("Not representable: {} days in seconds exceeds u32",
                        n)).into())
            .map(Self)
    }

    /// Returns a `Duration` with the given number of years, roughly.
    ///
    /// This function uses the average length of a year in the
    /// Gregorian calendar, 365.2425 days.
    pub fn years(n: u32) -> Result<Duration> {
        let days = 365.2425 * n as f64;
        if days > u32::MAX as f64 {
            return Err(Error::InvalidArgument(
                format!("Not representable: {} years in seconds exceeds u32",
                        n)).into());
        }

        (days as u32).checked_mul(24 * 60 * 60)
            .ok_or_else(|| Error::InvalidArgument(
                format!("Not representable: {} years in seconds exceeds u32",
                        n)).into())
            .map(Self)
    }

    /// Returns the duration as seconds.
    pub fn as_secs(self) -> u64 {
        self.0 as u64
    }
}

#[cfg(test)]
impl Arbitrary for Duration {
    fn arbitrary(g: &mut Gen) -> Self {
        Duration(u32::arbitrary(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn timestamp_roundtrip(t: Timestamp) -> bool {
            let u: u32 = t.into();
            Timestamp::from(u) == t
        }
    }

    #[test]
    fn durations() {
        assert_eq!(Duration::seconds(1).as_secs(), 1);
        assert_eq!(Duration::days(1).unwrap().as_secs(), 86400);
        assert!(Duration::years(200).is_ok());
        assert!(Duration::years(1000).is_err());
    }
}

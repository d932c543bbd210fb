use objc2_core_media::{CMTime, CMTimeFlags};

use crate::types::Time;

const VALID: CMTimeFlags = CMTimeFlags(1); // kCMTimeFlags_Valid

impl From<Time> for CMTime {
    fn from(time: Time) -> Self {
        CMTime {
            value: time.value,
            timescale: time.timescale,
            flags: if time.is_valid() { VALID } else { CMTimeFlags(0) },
            epoch: 0,
        }
    }
}

impl From<CMTime> for Time {
    /// Flags other than validity, and the epoch, are dropped.
    fn from(time: CMTime) -> Self {
        if time.flags.0 & VALID.0 == 0 {
            return Time::INVALID;
        }
        Time::new(time.value, time.timescale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_times_carry_the_flag() {
        let cm = CMTime::from(Time::new(1001, 30000));
        assert_eq!(cm.value, 1001);
        assert_eq!(cm.timescale, 30000);
        assert_eq!(cm.flags.0, 1);
        assert_eq!(Time::from(cm), Time::new(1001, 30000));
    }

    #[test]
    fn invalid_times_stay_invalid() {
        let cm = CMTime::from(Time::INVALID);
        assert_eq!(cm.flags.0, 0);
        assert_eq!(Time::from(cm), Time::INVALID);
    }
}

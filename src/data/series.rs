//! Derivation of the two fitted series from the loaded sessions.
//!
//! - energy: every present energy reading (missing readings dropped)
//! - time of day: seconds since midnight of every session start
//!
//! By default the time-of-day series is taken from *all* sessions, so the two
//! series can differ in length and their indices do not correspond. Pass
//! `aligned = true` to take both from the sessions that have an energy reading.

use chrono::Timelike;

use crate::domain::ChargingSession;

/// Seconds in a day; time-of-day values are always below this.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// The two numeric series the fitter works on.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub energy: Vec<f64>,
    pub time_of_day: Vec<f64>,
}

/// `hour * 3600 + minute * 60 + second` for the wall-clock part of `t`.
///
/// Sub-second precision is dropped. `Timelike::second` never reports a leap
/// second as 60, so the result is always in `0..86_400`.
pub fn seconds_since_midnight<T: Timelike>(t: &T) -> u32 {
    t.hour() * 3600 + t.minute() * 60 + t.second()
}

/// Build the energy and time-of-day series from loaded sessions.
pub fn derive_series(sessions: &[ChargingSession], aligned: bool) -> DerivedSeries {
    let energy: Vec<f64> = sessions.iter().filter_map(|s| s.energy_kwh).collect();

    let time_of_day = sessions
        .iter()
        .filter(|s| !aligned || s.energy_kwh.is_some())
        .map(|s| f64::from(seconds_since_midnight(&s.start)))
        .collect();

    DerivedSeries { energy, time_of_day }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn at(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn session(line: usize, h: u32, m: u32, energy: Option<f64>) -> ChargingSession {
        ChargingSession {
            line,
            start: NaiveDate::from_ymd_opt(2011, 7, 29).unwrap().and_time(at(h, m, 0)),
            energy_kwh: energy,
        }
    }

    #[test]
    fn seconds_since_midnight_examples() {
        assert_eq!(seconds_since_midnight(&at(0, 0, 0)), 0);
        assert_eq!(seconds_since_midnight(&at(14, 30, 15)), 52_215);
        assert_eq!(seconds_since_midnight(&at(23, 59, 59)), 86_399);
    }

    #[test]
    fn seconds_since_midnight_is_bounded_and_monotonic() {
        let mut prev = None;
        for secs in (0..SECONDS_PER_DAY).step_by(37) {
            let t = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
            let v = seconds_since_midnight(&t);
            assert_eq!(v, secs);
            assert!(v < SECONDS_PER_DAY);
            if let Some(p) = prev {
                assert!(v > p);
            }
            prev = Some(v);
        }
    }

    #[test]
    fn leap_second_nanos_stay_in_range() {
        let t = NaiveTime::from_hms_milli_opt(23, 59, 59, 1_500).unwrap();
        assert_eq!(seconds_since_midnight(&t), 86_399);
    }

    #[test]
    fn missing_energy_only_drops_from_energy_series() {
        let sessions = vec![
            session(2, 8, 0, Some(5.0)),
            session(3, 9, 30, None),
            session(4, 17, 45, Some(7.5)),
        ];
        let series = derive_series(&sessions, false);
        assert_eq!(series.energy, vec![5.0, 7.5]);
        assert_eq!(series.time_of_day, vec![28_800.0, 34_200.0, 63_900.0]);
    }

    #[test]
    fn aligned_mode_uses_the_same_rows() {
        let sessions = vec![
            session(2, 8, 0, Some(5.0)),
            session(3, 9, 30, None),
            session(4, 17, 45, Some(7.5)),
        ];
        let series = derive_series(&sessions, true);
        assert_eq!(series.energy.len(), series.time_of_day.len());
        assert_eq!(series.time_of_day, vec![28_800.0, 63_900.0]);
    }
}

//! Sun position from time and coordinates.
//!
//! Uses the NOAA solar calculator equations (atmospheric refraction is
//! ignored), which are accurate to well under a degree for dates within a
//! few centuries of J2000.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use crate::rank::map_number;

const MINUTES_PER_DAY: f64 = 1440.0;

/// Position of the sun needed for elevation and solar noon.
struct SunPosition {
    /// Declination in radians.
    declination: f64,
    /// Equation of time in minutes.
    equation_of_time: f64,
}

fn julian_century(time: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    let julian_day = seconds / 86_400.0 + 2_440_587.5;
    (julian_day - 2_451_545.0) / 36_525.0
}

fn sun_position(time: DateTime<Utc>) -> SunPosition {
    let jc = julian_century(time);

    let mean_long = (280.466_46 + jc * (36_000.769_83 + jc * 0.000_303_2)).rem_euclid(360.0);
    let mean_anom = 357.529_11 + jc * (35_999.050_29 - 0.000_153_7 * jc);
    let eccentricity = 0.016_708_634 - jc * (0.000_042_037 + 0.000_000_126_7 * jc);

    let m = mean_anom.to_radians();
    let center = m.sin() * (1.914_602 - jc * (0.004_817 + 0.000_014 * jc))
        + (2.0 * m).sin() * (0.019_993 - 0.000_101 * jc)
        + (3.0 * m).sin() * 0.000_289;
    let true_long = mean_long + center;
    let omega = (125.04 - 1_934.136 * jc).to_radians();
    let apparent_long = true_long - 0.005_69 - 0.004_78 * omega.sin();

    let mean_obliquity =
        23.0 + (26.0 + (21.448 - jc * (46.815 + jc * (0.000_59 - jc * 0.001_813))) / 60.0) / 60.0;
    let obliquity = (mean_obliquity + 0.002_56 * omega.cos()).to_radians();

    let declination = (obliquity.sin() * apparent_long.to_radians().sin()).asin();

    let y = (obliquity / 2.0).tan().powi(2);
    let l = mean_long.to_radians();
    let equation_of_time = 4.0
        * (y * (2.0 * l).sin() - 2.0 * eccentricity * m.sin()
            + 4.0 * eccentricity * y * m.sin() * (2.0 * l).cos()
            - 0.5 * y * y * (4.0 * l).sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
        .to_degrees();

    SunPosition {
        declination,
        equation_of_time,
    }
}

/// Solar elevation in degrees above the horizon.
#[must_use]
pub fn solar_elevation(time: DateTime<Utc>, latitude: f64, longitude: f64) -> f64 {
    let sun = sun_position(time);
    let clock = time.time();
    let minutes = (f64::from(clock.num_seconds_from_midnight())
        + f64::from(clock.nanosecond()) * 1e-9)
        / 60.0;
    let true_solar_time =
        (minutes + sun.equation_of_time + 4.0 * longitude).rem_euclid(MINUTES_PER_DAY);
    let hour_angle = (true_solar_time / 4.0 - 180.0).to_radians();

    let lat = latitude.to_radians();
    let cos_zenith = lat.sin() * sun.declination.sin()
        + lat.cos() * sun.declination.cos() * hour_angle.cos();
    90.0 - cos_zenith.clamp(-1.0, 1.0).acos().to_degrees()
}

fn at_minutes(date: NaiveDate, minutes: f64) -> DateTime<Utc> {
    let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    #[allow(clippy::cast_possible_truncation)]
    let millis = (minutes * 60_000.0).round() as i64;
    midnight + Duration::milliseconds(millis)
}

/// Time of solar noon (highest sun) on `date` at `longitude`.
#[must_use]
pub fn solar_noon(date: NaiveDate, longitude: f64) -> DateTime<Utc> {
    // first guess at mean noon, refined with the equation of time there
    let guess = at_minutes(date, 720.0 - 4.0 * longitude);
    let sun = sun_position(guess);
    at_minutes(date, 720.0 - 4.0 * longitude - sun.equation_of_time)
}

/// Time of solar midnight (lowest sun) closest to the start of `date`.
#[must_use]
pub fn solar_midnight(date: NaiveDate, longitude: f64) -> DateTime<Utc> {
    let guess = at_minutes(date, -4.0 * longitude);
    let sun = sun_position(guess);
    at_minutes(date, -4.0 * longitude - sun.equation_of_time)
}

/// Solar elevation as a number from 0 to 1.
///
/// The result is 0 at solar midnight, 0.5 at sunrise and sunset, and 1 at
/// solar noon. Noon and midnight are taken on the UTC date of `time`.
#[must_use]
pub fn normalized_solar_elevation(latitude: f64, longitude: f64, time: DateTime<Utc>) -> f64 {
    let date = time.date_naive();
    let elevation = |t| solar_elevation(t, latitude, longitude);
    let highest = elevation(solar_noon(date, longitude));
    let lowest = elevation(solar_midnight(date, longitude));
    let actual = elevation(time);
    if actual > 0.0 {
        map_number(actual, (0.0, highest), (0.5, 1.0))
    } else {
        map_number(actual, (lowest, 0.0), (0.0, 0.5))
    }
}

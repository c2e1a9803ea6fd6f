// by default, chrono will format with 10 or so fractional digits but python's
// builtin iso datetime parser only supports 6 digits, so this makes it a pain
// for anyone post-processing recorded snapshots
pub const ISO_8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%:z";

pub fn serialize_time<S>(
    this: &chrono::DateTime<chrono::Local>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::ser::Serializer,
{
    serializer.collect_str(&this.format(ISO_8601_FORMAT))
}

/// Rounds an angle to a fixed number of decimals so recorded values stay
/// readable. Non-finite values are written as-is.
pub fn serialize_degrees<S>(this: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::ser::Serializer,
{
    if this.is_finite() {
        serializer.serialize_f64((this * 1000.0).round() / 1000.0)
    } else {
        serializer.serialize_f64(*this)
    }
}

use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Time(pub DateTime<Utc>);

impl Time {
    pub fn now() -> Self { Self(Utc::now()) }

    /// Fractional seconds since the Unix epoch, the score format of the
    /// queue sorted sets.
    pub fn epoch_secs(self) -> f64 {
        self.0.timestamp_millis() as f64 / 1000.0
    }
}

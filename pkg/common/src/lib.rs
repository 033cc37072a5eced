use chrono::{DateTime, Utc};

/// Trait for providing the current UTC time.
pub trait Now: Send + Sync + 'static {
    /// Returns the current UTC time.
    fn now() -> DateTime<Utc>;

    /// Returns the current time as seconds since the unix epoch.
    fn timestamp() -> i64 {
        Self::now().timestamp()
    }
}

/// Implementation that returns the actual current system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNow;

impl Now for SystemNow {
    fn now() -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(feature = "mock")]
pub mod mock {
    use super::*;

    /// 2020-01-01 00:00:00 UTC
    pub const MOCK_TIMESTAMP: i64 = 1_577_836_800;

    /// Mock time provider for testing, frozen at [`MOCK_TIMESTAMP`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct MockNow;

    impl Now for MockNow {
        fn now() -> DateTime<Utc> {
            DateTime::from_timestamp(MOCK_TIMESTAMP, 0).unwrap()
        }
    }
}

use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub scan_interval_secs: u64,
    pub fetch_concurrency: usize,
    pub tap_threshold: f64,
    /// How far back from "now" the arbitrage scan reaches, to still cover
    /// fixtures that kicked off moments ago.
    pub scan_lookback_mins: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            scan_interval_secs: env::var("SCAN_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            fetch_concurrency: env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap(),
            tap_threshold: env::var("TAP_THRESHOLD")
                .unwrap_or_else(|_| "100.0".to_string())
                .parse()
                .unwrap(),
            scan_lookback_mins: env::var("SCAN_LOOKBACK_MINS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap(),
        }
    }
}

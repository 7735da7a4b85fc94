/// Roll number under which the total number of sessions held is stored.
pub const TOTAL_COUNT_KEY: &str = "TOTAL_COUNT";

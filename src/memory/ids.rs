use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use uuid::Uuid;

static LAST_ISSUED_NANOS: AtomicI64 = AtomicI64::new(0);

/// Nanosecond timestamp that is strictly increasing within the process, so
/// two records created within one clock tick still get distinct instants.
pub fn next_timestamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    let mut last = LAST_ISSUED_NANOS.load(Ordering::SeqCst);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_ISSUED_NANOS.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return DateTime::from_timestamp_nanos(candidate),
            Err(observed) => last = observed,
        }
    }
}

/// `{user_id}_{nanos}_{8 hex}`. The random tail covers other processes
/// writing to the same store.
pub fn record_id(user_id: &str, created_at: &DateTime<Utc>) -> String {
    let nanos = created_at.timestamp_nanos_opt().unwrap_or_default();
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("{}_{}_{}", user_id, nanos, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut previous = next_timestamp();
        for _ in 0..1_000 {
            let next = next_timestamp();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_record_ids_are_unique_in_a_burst() {
        let ids: HashSet<String> = (0..1_000)
            .map(|_| record_id("alice", &next_timestamp()))
            .collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_record_id_shape() {
        let ts = DateTime::from_timestamp_nanos(1_700_000_000_123_456_789);
        let id = record_id("alice", &ts);
        assert!(id.starts_with("alice_1700000000123456789_"));
        assert_eq!(id.rsplit('_').next().unwrap().len(), 8);
    }

    #[test]
    fn test_timestamps_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| next_timestamp()).collect::<Vec<_>>()))
            .collect();
        let all: HashSet<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert_eq!(all.len(), 1_000);
    }
}

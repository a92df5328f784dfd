/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as row ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER so the
/// admin UI can keep ids as numbers):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: per-process sequence
///
/// Ids are strictly increasing within the process. When a millisecond's
/// 4096 sequence values run out the id borrows from the next millisecond.
pub fn snowflake_id() -> i64 {
    use std::sync::atomic::{AtomicI64, Ordering};

    const EPOCH_MS: i64 = 1_704_067_200_000;
    static LAST: AtomicI64 = AtomicI64::new(0);

    let ts = (now_millis() - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let floor = ts << 12;
    let mut last = LAST.load(Ordering::Relaxed);
    loop {
        let next = floor.max(last + 1);
        match LAST.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_fits_js_safe_integer() {
        let id = snowflake_id();
        assert!(id > 0);
        assert!(id < (1_i64 << 53));
    }

    #[test]
    fn back_to_back_ids_never_collide() {
        let mut seen = std::collections::HashSet::new();
        let mut prev = 0;
        for _ in 0..20_000 {
            let id = snowflake_id();
            assert!(id > prev);
            assert!(seen.insert(id));
            prev = id;
        }
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..5_000).map(|_| snowflake_id()).collect::<Vec<_>>()))
            .collect();
        let mut all: Vec<i64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn snowflake_is_time_ordered_across_milliseconds() {
        let a = snowflake_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = snowflake_id();
        assert!(b > a);
    }
}

//! Property tests for report analytics and the result cache.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use stratdash_core::domain::series_from_closes;
use stratdash_core::strategies::BuyAndHold;
use stratdash_core::{run_backtest, EngineConfig, Fingerprint, ParameterSet};
use stratdash_runner::{monthly_returns, CachePolicy, ResultCache};

fn daily(n: usize) -> Vec<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(2022, 11, 20)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n).map(|i| base + Duration::days(i as i64)).collect()
}

proptest! {
    #[test]
    fn months_compound_to_the_total(returns in prop::collection::vec(-0.05f64..0.05, 1..400)) {
        let ts = daily(returns.len());
        let months = monthly_returns(&ts, &returns);

        let total: f64 = returns.iter().map(|r| 1.0 + r).product();
        let by_month: f64 = months.iter().map(|m| 1.0 + m.value).product();
        prop_assert!((total - by_month).abs() < 1e-9 * total.max(1.0));

        let mut keys: Vec<_> = months.iter().map(|m| (m.year, m.month)).collect();
        let before = keys.len();
        keys.dedup();
        prop_assert_eq!(keys.len(), before);
    }

    #[test]
    fn cache_never_exceeds_capacity(capacity in 1usize..8, inserts in 0usize..30) {
        let cache = ResultCache::new(CachePolicy { ttl: None, max_entries: capacity });
        let series = series_from_closes("KO", &[10.0, 11.0, 12.0]);
        let result = Arc::new(
            run_backtest(&BuyAndHold, &series, &ParameterSet::new(), &EngineConfig::default()).unwrap(),
        );
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for i in 0..inserts {
            let key = Fingerprint::compute(
                &format!("T{i}"),
                day,
                day,
                "buy_and_hold",
                &ParameterSet::new(),
                &EngineConfig::default(),
            );
            cache.insert(key, Arc::clone(&result));
            prop_assert!(cache.len() <= capacity);
        }
        prop_assert_eq!(cache.len(), inserts.min(capacity));
    }
}

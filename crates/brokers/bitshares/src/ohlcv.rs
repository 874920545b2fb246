use dexbridge_core::Candle;

/// Client-side window over candles the bridge returned in full.
///
/// Drops candles opened before `since`, then keeps the last `limit`. A
/// candle without a timestamp cannot be placed in the window, so it is
/// dropped whenever `since` is given.
pub fn filter_candles(mut candles: Vec<Candle>, since: Option<i64>, limit: Option<u32>) -> Vec<Candle> {
    if let Some(since) = since {
        candles.retain(|c| c.timestamp.is_some_and(|t| t >= since));
    }
    if let Some(limit) = limit {
        let keep = limit as usize;
        if candles.len() > keep {
            candles.drain(..candles.len() - keep);
        }
    }
    candles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(timestamps: &[i64]) -> Vec<Candle> {
        timestamps
            .iter()
            .map(|&t| Candle {
                timestamp: Some(t),
                open: Some(1.0),
                close: Some(1.0),
                ..Default::default()
            })
            .collect()
    }

    fn stamps(c: &[Candle]) -> Vec<i64> {
        c.iter().filter_map(|c| c.timestamp).collect()
    }

    #[test]
    fn test_since_is_inclusive() {
        let out = filter_candles(candles(&[100, 200, 300, 400]), Some(200), None);
        assert_eq!(stamps(&out), vec![200, 300, 400]);
    }

    #[test]
    fn test_limit_keeps_tail() {
        let out = filter_candles(candles(&[100, 200, 300, 400]), None, Some(2));
        assert_eq!(stamps(&out), vec![300, 400]);
    }

    #[test]
    fn test_since_then_limit() {
        let out = filter_candles(candles(&[100, 200, 300, 400, 500]), Some(250), Some(2));
        assert_eq!(stamps(&out), vec![400, 500]);
    }

    #[test]
    fn test_limit_larger_than_set() {
        let out = filter_candles(candles(&[100, 200]), Some(150), Some(10));
        assert_eq!(stamps(&out), vec![200]);
    }

    #[test]
    fn test_untimed_candle_dropped_only_with_since() {
        let mut set = candles(&[100, 200]);
        set.insert(1, Candle::default());
        assert_eq!(filter_candles(set.clone(), None, None).len(), 3);
        assert_eq!(stamps(&filter_candles(set, Some(0), None)), vec![100, 200]);
    }

    #[test]
    fn test_zero_limit_is_empty() {
        assert!(filter_candles(candles(&[100, 200]), None, Some(0)).is_empty());
    }
}

//! Post-aggregation: per-device roll-up of resultant length over a calculation

use std::collections::BTreeMap;

use cidstat_core::{DeviceId, DeviceSummary, StatisticResult};

/// Count, mean, sum and median of one device's lengths
///
/// `None` for an empty slice. Even counts take the mean of the two middle
/// values as the median.
pub fn summarize(device_id: DeviceId, lengths: &[f64]) -> Option<DeviceSummary> {
    if lengths.is_empty() {
        return None;
    }

    let mut sorted = lengths.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let median_length = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    let sum_length: f64 = sorted.iter().sum();

    Some(DeviceSummary {
        device_id,
        statistic_count: n as u64,
        avg_length: sum_length / n as f64,
        sum_length,
        median_length,
    })
}

/// One summary per device appearing in `results`, ordered by device id
pub fn summarize_results<'a>(results: impl IntoIterator<Item = &'a StatisticResult>) -> Vec<DeviceSummary> {
    let mut lengths: BTreeMap<DeviceId, Vec<f64>> = BTreeMap::new();
    for result in results {
        lengths.entry(result.device_id).or_default().push(result.length);
    }

    lengths
        .into_iter()
        .filter_map(|(device_id, lengths)| summarize(device_id, &lengths))
        .collect()
}

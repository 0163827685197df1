//! Chart-ready views over [`Stats`].

use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeDelta};

use crate::types::{HistogramBin, Stats, WeeklyPoint};
use crate::utils::format_week_label;

/// Width of each chat-length bucket.
pub const BIN_WIDTH: u64 = 5;
/// Number of fixed-width buckets before the overflow bucket.
pub const BIN_COUNT: u64 = 20;
pub const OVERFLOW_LABEL: &str = "100+";

/// Weekly message counts stacked by model, one entry per week from the
/// earliest to the latest recorded week. Weeks without activity are
/// included with zero counts.
pub fn weekly_series(stats: &Stats) -> Vec<WeeklyPoint> {
    let weeks: Vec<NaiveDate> = stats
        .weekly_messages
        .keys()
        .filter_map(|key| NaiveDate::parse_from_str(key, "%Y-%m-%d").ok())
        .collect();

    let (Some(first), Some(last)) = (weeks.iter().min(), weeks.iter().max()) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut next = Some(*first);
    while let Some(current) = next
        && current <= *last
    {
        let key = current.format("%Y-%m-%d").to_string();
        let mut counts: BTreeMap<String, u64> = stats
            .model_counts
            .keys()
            .map(|model| (model.clone(), 0))
            .collect();
        let mut total = 0;

        if let Some(week) = stats.weekly_messages.get(&key) {
            for (model, count) in week {
                *counts.entry(model.clone()).or_insert(0) += count;
                total += count;
            }
        }

        series.push(WeeklyPoint {
            week: format_week_label(current),
            week_start: key,
            counts,
            total,
        });

        next = current.checked_add_signed(TimeDelta::weeks(1));
    }

    series
}

/// Distribution of conversation lengths over `1-5` … `96-100` and `100+`.
///
/// Lengths of zero land in the first bucket, so the bucket counts always
/// add up to the number of conversations.
pub fn length_histogram(chat_lengths: &[u64]) -> Vec<HistogramBin> {
    let mut bins: Vec<HistogramBin> = (0..BIN_COUNT)
        .map(|i| HistogramBin {
            range: format!("{}-{}", i * BIN_WIDTH + 1, (i + 1) * BIN_WIDTH),
            count: 0,
        })
        .collect();
    bins.push(HistogramBin {
        range: OVERFLOW_LABEL.to_string(),
        count: 0,
    });

    for &length in chat_lengths {
        bins[bin_index(length)].count += 1;
    }

    bins
}

fn bin_index(length: u64) -> usize {
    if length > BIN_WIDTH * BIN_COUNT {
        BIN_COUNT as usize
    } else {
        (length.saturating_sub(1) / BIN_WIDTH) as usize
    }
}

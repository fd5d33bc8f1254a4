//! Daily per-location rollups

use crate::types::{DailySummary, Observation};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Accumulator for temperature statistics over one location's day
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    temperatures: Vec<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.temperatures.push(value);
    }

    pub fn min(&self) -> Option<f64> {
        if self.temperatures.is_empty() {
            return None;
        }
        Some(self.temperatures.iter().copied().fold(f64::INFINITY, f64::min))
    }

    pub fn max(&self) -> Option<f64> {
        if self.temperatures.is_empty() {
            return None;
        }
        Some(
            self.temperatures
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
        )
    }

    pub fn avg(&self) -> Option<f64> {
        if self.temperatures.is_empty() {
            return None;
        }
        let sum: f64 = self.temperatures.iter().sum();
        Some(sum / self.temperatures.len() as f64)
    }

    pub fn count(&self) -> usize {
        self.temperatures.len()
    }
}

/// Counts condition labels, remembering the order each was first seen
#[derive(Debug, Clone, Default)]
pub struct ConditionTally {
    /// (label, count) in first-seen order
    counts: Vec<(String, u32)>,
}

impl ConditionTally {
    pub fn add(&mut self, label: &str) {
        match self.counts.iter_mut().find(|(seen, _)| seen == label) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((label.to_string(), 1)),
        }
    }

    /// Most frequent label; ties go to the label seen first
    pub fn dominant(&self) -> Option<&str> {
        let mut best: Option<&(String, u32)> = None;
        for entry in &self.counts {
            // strict > keeps the earlier label on ties
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(label, _)| label.as_str())
    }
}

#[derive(Debug, Default)]
struct LocationDay {
    temperatures: Accumulator,
    conditions: ConditionTally,
}

/// Group a day's observations by location and summarise each group
///
/// Groups come out in the order their location first appears in
/// `observations`. Locations without observations produce nothing.
pub fn summarize_day(observations: &[Observation], date: NaiveDate) -> Vec<DailySummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, LocationDay> = HashMap::new();

    for obs in observations {
        let group = groups.entry(obs.location.as_str()).or_insert_with(|| {
            order.push(obs.location.as_str());
            LocationDay::default()
        });
        group.temperatures.add(obs.temperature);
        group.conditions.add(&obs.condition);
    }

    order
        .into_iter()
        .filter_map(|location| {
            let group = groups.get(location)?;
            Some(DailySummary {
                location: location.to_string(),
                date,
                avg_temperature: group.temperatures.avg()?,
                max_temperature: group.temperatures.max()?,
                min_temperature: group.temperatures.min()?,
                dominant_condition: group.conditions.dominant()?.to_string(),
                observation_count: group.temperatures.count() as u32,
            })
        })
        .collect()
}

//! Multi-channel table sharing one time index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::series::{check_index, TimeSeries, Timestamp};
use crate::processing::ProcessingError;

/// Named channels on a shared, strictly increasing index.
///
/// Tables are treated as values: every transformation in the crate builds a
/// new table instead of editing one in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    index: Vec<Timestamp>,
    channels: BTreeMap<String, Vec<f64>>,
}

impl Table {
    /// Empty table over `index`.
    pub fn new(index: Vec<Timestamp>) -> Result<Self, ProcessingError> {
        check_index(&index)?;
        Ok(Self {
            index,
            channels: BTreeMap::new(),
        })
    }

    /// Table holding a single series under `name`.
    pub fn from_series(name: &str, series: &TimeSeries) -> Self {
        let mut channels = BTreeMap::new();
        channels.insert(name.to_string(), series.values().to_vec());
        Self {
            index: series.timestamps().to_vec(),
            channels,
        }
    }

    /// Builder-style insert; replaces an existing channel of the same name.
    pub fn with_channel(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, ProcessingError> {
        self.insert(name, values)?;
        Ok(self)
    }

    /// Insert or replace a channel. Its length must match the index.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<(), ProcessingError> {
        if values.len() != self.index.len() {
            return Err(ProcessingError::LengthMismatch {
                left: self.index.len(),
                right: values.len(),
            });
        }
        self.channels.insert(name.into(), values);
        Ok(())
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.channels.get(name).map(Vec::as_slice)
    }

    /// Channel values, or `MissingChannel`.
    pub fn require(&self, name: &str) -> Result<&[f64], ProcessingError> {
        self.get(name)
            .ok_or_else(|| ProcessingError::MissingChannel(name.to_string()))
    }

    /// Copy one channel out as a standalone series.
    pub fn series(&self, name: &str) -> Result<TimeSeries, ProcessingError> {
        let values = self.require(name)?;
        TimeSeries::new(self.index.clone(), values.to_vec())
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn channels(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.channels.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Rows with `start <= t <= end`.
    pub fn slice_time(&self, start: Timestamp, end: Timestamp) -> Self {
        let lo = self.index.partition_point(|&t| t < start);
        let hi = self.index.partition_point(|&t| t <= end).max(lo);
        Self {
            index: self.index[lo..hi].to_vec(),
            channels: self
                .channels
                .iter()
                .map(|(k, v)| (k.clone(), v[lo..hi].to_vec()))
                .collect(),
        }
    }
}

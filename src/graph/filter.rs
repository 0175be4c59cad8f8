//! Per-node filter flags

use std::collections::TryReserveError;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use super::node::NodeId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterState {
    #[default]
    NotFiltered,
    Filtered,
}

/// Filter flags indexed by node id. Grows with the factory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    states: Vec<FilterState>,
}

impl Filter {
    pub fn new(size: usize) -> Self {
        Self { states: vec![FilterState::NotFiltered; size] }
    }

    pub(crate) fn try_new(size: usize) -> std::result::Result<Self, TryReserveError> {
        let mut states = Vec::new();
        states.try_reserve_exact(size)?;
        states.resize(size, FilterState::NotFiltered);
        Ok(Self { states })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub(crate) fn resize(&mut self, size: usize) {
        self.states.resize(size, FilterState::NotFiltered);
    }

    pub fn state(&self, id: NodeId) -> FilterState {
        self.states.get(id as usize).copied().unwrap_or_default()
    }

    pub fn is_filtered(&self, id: NodeId) -> bool {
        self.state(id) == FilterState::Filtered
    }

    pub(crate) fn set(&mut self, id: NodeId, state: FilterState) {
        if let Some(s) = self.states.get_mut(id as usize) {
            *s = state;
        }
    }

    /// Clear every flag
    pub fn initialize(&mut self) {
        self.states.iter_mut().for_each(|s| *s = FilterState::NotFiltered);
    }

    pub fn filtered_count(&self) -> usize {
        self.states.iter().filter(|s| **s == FilterState::Filtered).count()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        Ok(())
    }

    /// Load a filter saved for a factory of `expected` slots
    pub fn load(path: &Path, expected: usize) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let filter: Filter = bincode::deserialize_from(reader)?;
        if filter.len() != expected {
            return Err(GraphError::FilterMismatch { expected, found: filter.len() });
        }
        Ok(filter)
    }
}

//! Descriptive metadata carried by every mesh.

use serde::{Deserialize, Serialize};

/// Name, description and time stamp of a mesh.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshInfo {
    pub name: String,
    pub description: String,
    pub time: f64,
    pub iteration: i32,
    pub order: i32,
    pub time_unit: String,
}

impl MeshInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Copy the name, description and time stamp of `other`.
    pub fn copy_tiny_info_from(&mut self, other: &MeshInfo) {
        self.clone_from(other);
    }

    /// Compare the time stamp and strings; `Err` carries the first difference.
    pub fn is_equal_if_not_why(&self, other: &MeshInfo, precision: f64) -> Result<(), String> {
        if self.name != other.name {
            return Err(format!("mesh names differ: \"{}\" != \"{}\"", self.name, other.name));
        }
        if self.description != other.description {
            return Err(format!(
                "mesh descriptions differ: \"{}\" != \"{}\"",
                self.description, other.description
            ));
        }
        if self.iteration != other.iteration || self.order != other.order {
            return Err(format!(
                "time iterations differ: ({}, {}) != ({}, {})",
                self.iteration, self.order, other.iteration, other.order
            ));
        }
        if self.time_unit != other.time_unit {
            return Err(format!(
                "time units differ: \"{}\" != \"{}\"",
                self.time_unit, other.time_unit
            ));
        }
        if (self.time - other.time).abs() > precision {
            return Err(format!("times differ: {} != {}", self.time, other.time));
        }
        Ok(())
    }
}

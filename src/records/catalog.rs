// Sample catalog - suggestion lists for the label inputs
//
// Every material, name and color the user has entered is remembered in
// first-use order. Materials start from the configured defaults.

use serde::Serialize;

use super::{Record, RecordLabels};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleCatalog {
    materials: Vec<String>,
    names: Vec<String>,
    colors: Vec<String>,
}

fn remember_one(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

impl SampleCatalog {
    pub fn new<I, S>(default_materials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for material in default_materials {
            remember_one(&mut catalog.materials, material.as_ref());
        }
        catalog
    }

    pub fn remember(&mut self, labels: &RecordLabels) {
        remember_one(&mut self.materials, &labels.material);
        remember_one(&mut self.names, &labels.name);
        remember_one(&mut self.colors, &labels.color);
    }

    /// Catalog rebuilt from defaults plus every record of a loaded dataset
    pub fn reseeded<'a, I, S, R>(default_materials: I, records: R) -> Self
    where
        R: IntoIterator<Item = &'a Record>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::new(default_materials);
        for record in records {
            catalog.remember(&record.labels());
        }
        catalog
    }

    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }
}

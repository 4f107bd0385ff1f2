use crate::records::split_entries;
use gfaview_core::{GenomeId, GenomeIndexing};
use std::collections::HashMap;

/// Genome names seen in `ORI:Z:` headers and the rule for reading membership fields.
pub struct GenomeTable {
    mode: GenomeIndexing,
    pre_indexed: bool,
    names: Vec<String>,
    indices: HashMap<String, GenomeId>,
}

impl GenomeTable {
    pub fn new(mode: GenomeIndexing) -> Self {
        Self {
            mode,
            pre_indexed: false,
            names: Vec::new(),
            indices: HashMap::new(),
        }
    }

    /// Replace the name table; index is the position in the header list.
    pub fn set_names(&mut self, names: &[&str]) {
        self.names = names.iter().map(|name| name.to_string()).collect();
        self.indices = self
            .names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), GenomeId(idx as u32)))
            .collect();
    }

    /// A `BUILD:Z:VCF2GRAPH` header was read. Sticky for the rest of the file.
    pub fn mark_pre_indexed(&mut self) {
        self.pre_indexed = true;
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether membership entries are read as raw indices right now.
    pub fn reads_indices(&self) -> bool {
        match self.mode {
            GenomeIndexing::Auto => self.pre_indexed,
            GenomeIndexing::Names => false,
            GenomeIndexing::Indices => true,
        }
    }

    pub fn saw_pre_indexed_header(&self) -> bool {
        self.pre_indexed
    }

    /// Resolve a raw `ORI:Z:` payload to genome indices, keeping first occurrence order.
    pub fn resolve(&self, payload: &str) -> Result<Vec<GenomeId>, String> {
        let reads_indices = self.reads_indices();
        let mut genomes = Vec::new();
        for entry in split_entries(payload) {
            let genome = if reads_indices {
                entry
                    .parse::<u32>()
                    .map(GenomeId)
                    .map_err(|_| format!("genome index '{entry}' is not numeric"))?
            } else {
                *self
                    .indices
                    .get(entry)
                    .ok_or_else(|| format!("unknown genome name '{entry}'"))?
            };
            if !genomes.contains(&genome) {
                genomes.push(genome);
            }
        }
        Ok(genomes)
    }
}

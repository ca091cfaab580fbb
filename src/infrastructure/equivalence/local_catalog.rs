//! Offline cross-reference dataset.
//!
//! A CSV of `reference,equivalent,brand,description` rows, bundled with the
//! binary and replaceable by a file. Lookups work in both directions: a code
//! found in either column yields every other code of its group.

use crate::domain::entities::equivalent::{EquivalentCandidate, LookupMode};
use crate::domain::error::{DomainError, SourceError};
use crate::domain::ports::equivalence_provider::EquivalenceProvider;
use crate::domain::values::reference::normalize_code;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

pub const NAME: &str = "local_catalog";
const BUNDLED: &str = include_str!("../../../data/cross_references.csv");

#[derive(Debug, Clone, serde::Deserialize)]
struct Row {
    reference: String,
    equivalent: String,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub struct LocalCatalog {
    rows: Vec<Row>,
    /// Normalized code → indices of the rows it appears in.
    index: HashMap<String, Vec<usize>>,
}

impl LocalCatalog {
    pub fn bundled() -> Result<Self, DomainError> {
        Self::from_reader(BUNDLED.as_bytes())
    }

    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        let file = std::fs::File::open(path)
            .map_err(|e| DomainError::Config(format!("cross-reference file {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DomainError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for result in csv_reader.deserialize::<Row>() {
            let row = result.map_err(|e| DomainError::Parse(format!("cross-reference csv: {e}")))?;
            let i = rows.len();
            for code in [&row.reference, &row.equivalent] {
                let key = normalize_code(code);
                if !key.is_empty() {
                    index.entry(key).or_default().push(i);
                }
            }
            rows.push(row);
        }
        tracing::debug!(rows = rows.len(), codes = index.len(), "cross-reference catalog loaded");
        Ok(Self { rows, index })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every code sharing a group with `reference`, in file order.
    pub fn lookup(&self, reference: &str) -> Vec<EquivalentCandidate> {
        let key = normalize_code(reference);
        let Some(hits) = self.index.get(&key) else {
            return Vec::new();
        };

        // A hit on the equivalent column pulls in the whole group of its reference.
        let mut group: Vec<usize> = Vec::new();
        for &i in hits {
            let anchor = normalize_code(&self.rows[i].reference);
            for &j in self.index.get(&anchor).into_iter().flatten() {
                if !group.contains(&j) {
                    group.push(j);
                }
            }
        }
        group.sort_unstable();

        let mut seen = HashSet::from([key]);
        let mut out = Vec::new();
        for i in group {
            let row = &self.rows[i];
            for (code, is_reference) in [(&row.reference, true), (&row.equivalent, false)] {
                if seen.insert(normalize_code(code)) {
                    out.push(EquivalentCandidate {
                        code: code.clone(),
                        brand: if is_reference { None } else { row.brand.clone() },
                        description: row.description.clone(),
                        price_text: None,
                        image_url: None,
                    });
                }
            }
        }
        out
    }
}

#[async_trait]
impl EquivalenceProvider for LocalCatalog {
    fn name(&self) -> &str {
        NAME
    }

    async fn candidates(
        &self,
        reference: &str,
        _mode: LookupMode,
    ) -> Result<Vec<EquivalentCandidate>, SourceError> {
        Ok(self.lookup(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "reference,equivalent,brand,description\n\
        7700500155,0986041850,BOSCH,Alternador\n\
        7700500155,CA1544IR,HC-CARGO,Alternador\n\
        1J0615301M,DF2791,TRW,Disco\n";

    fn codes(c: &[EquivalentCandidate]) -> Vec<&str> {
        c.iter().map(|c| c.code.as_str()).collect()
    }

    #[test]
    fn test_forward_lookup() {
        let catalog = LocalCatalog::from_reader(CSV.as_bytes()).unwrap();
        let hits = catalog.lookup("7700 500 155");
        assert_eq!(codes(&hits), vec!["0986041850", "CA1544IR"]);
        assert_eq!(hits[0].brand.as_deref(), Some("BOSCH"));
    }

    #[test]
    fn test_reverse_lookup_returns_group() {
        let catalog = LocalCatalog::from_reader(CSV.as_bytes()).unwrap();
        let hits = catalog.lookup("ca-1544-ir");
        assert_eq!(codes(&hits), vec!["7700500155", "0986041850"]);
    }

    #[test]
    fn test_unknown_code() {
        let catalog = LocalCatalog::from_reader(CSV.as_bytes()).unwrap();
        assert!(catalog.lookup("ZZZ99999").is_empty());
    }

    #[test]
    fn test_bundled_dataset_parses() {
        let catalog = LocalCatalog::bundled().unwrap();
        assert!(!catalog.is_empty());
        assert!(!catalog.lookup("7700500155").is_empty());
    }
}

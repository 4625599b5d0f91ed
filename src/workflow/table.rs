// Transition tables as configuration data
//
// Each report kind gets its own table: a mapping from the current status to
// the statuses reachable from it and whether that move needs a reason. A table
// may also carry the fixed list of violation labels administrators pick from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use super::errors::TableError;
use super::types::{ReportKind, ReportStatus};

pub const SUPPORTED_TABLE_VERSION: u32 = 1;

const PLATE_REVERSIBLE: &str = include_str!("tables/plate_reversible.toml");
const PLATE_INVESTIGATION: &str = include_str!("tables/plate_investigation.toml");
const OBSTRUCTION: &str = include_str!("tables/obstruction.toml");

/// A single legal move out of a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionRule {
    pub target: ReportStatus,
    pub requires_reason: bool,
}

/// On-disk form of one transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDef {
    pub from: ReportStatus,
    pub to: ReportStatus,
    #[serde(default)]
    pub requires_reason: bool,
}

/// On-disk form of one kind's table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDocument {
    pub version: u32,
    pub name: String,
    pub kind: ReportKind,
    /// Allowed violation labels. Empty means free text.
    #[serde(default)]
    pub violations: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
}

/// A user-supplied file holding tables for several kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSetDocument {
    pub tables: Vec<TableDocument>,
}

/// Which of the two observed plate-number flows is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlateVariant {
    Reversible,
    #[default]
    Investigation,
}

impl FromStr for PlateVariant {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reversible" | "plate-reversible" => Ok(PlateVariant::Reversible),
            "investigation" | "plate-investigation" => Ok(PlateVariant::Investigation),
            other => Err(TableError::UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for PlateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlateVariant::Reversible => f.write_str("reversible"),
            PlateVariant::Investigation => f.write_str("investigation"),
        }
    }
}

/// Validated rules for one report kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindTable {
    pub name: String,
    pub version: u32,
    rules: BTreeMap<ReportStatus, Vec<TransitionRule>>,
    violation_catalogue: Vec<String>,
}

impl KindTable {
    pub fn rules(&self, status: ReportStatus) -> &[TransitionRule] {
        self.rules.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn statuses(&self) -> impl Iterator<Item = ReportStatus> + '_ {
        self.rules.keys().copied()
    }

    pub fn violation_catalogue(&self) -> &[String] {
        &self.violation_catalogue
    }

    /// Catalogue spelling of `label`, matched case-insensitively.
    /// Any label is accepted as-is when the catalogue is empty.
    pub fn canonical_violation<'a>(&'a self, label: &'a str) -> Option<&'a str> {
        if self.violation_catalogue.is_empty() {
            return Some(label);
        }
        self.violation_catalogue
            .iter()
            .find(|entry| entry.eq_ignore_ascii_case(label))
            .map(String::as_str)
    }

    fn from_document(document: TableDocument) -> Result<Self, TableError> {
        if document.version != SUPPORTED_TABLE_VERSION {
            return Err(TableError::UnsupportedVersion {
                found: document.version,
                supported: SUPPORTED_TABLE_VERSION,
            });
        }

        let mut rules: BTreeMap<ReportStatus, Vec<TransitionRule>> = BTreeMap::new();
        for def in document.transitions {
            if def.from == def.to {
                return Err(TableError::SelfTransition(def.from));
            }
            if def.from.is_investigation() && !def.requires_reason {
                return Err(TableError::UnguardedInvestigationExit {
                    from: def.from,
                    to: def.to,
                });
            }

            let entry = rules.entry(def.from).or_default();
            if entry.iter().any(|rule| rule.target == def.to) {
                return Err(TableError::DuplicateTarget {
                    from: def.from,
                    to: def.to,
                });
            }
            entry.push(TransitionRule {
                target: def.to,
                requires_reason: def.requires_reason,
            });
        }

        let mut violation_catalogue: Vec<String> = Vec::new();
        for label in document.violations {
            let label = label.trim();
            if label.is_empty() {
                return Err(TableError::BlankViolationLabel);
            }
            if violation_catalogue
                .iter()
                .any(|entry| entry.eq_ignore_ascii_case(label))
            {
                return Err(TableError::DuplicateViolationLabel(label.to_string()));
            }
            violation_catalogue.push(label.to_string());
        }

        Ok(Self {
            name: document.name,
            version: document.version,
            rules,
            violation_catalogue,
        })
    }
}

/// Every kind's transition table, loaded once and then read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    tables: HashMap<ReportKind, KindTable>,
}

impl TransitionTable {
    /// Tables shipped with the crate
    pub fn builtin(variant: PlateVariant) -> Result<Self, TableError> {
        let plate = match variant {
            PlateVariant::Reversible => PLATE_REVERSIBLE,
            PlateVariant::Investigation => PLATE_INVESTIGATION,
        };

        let documents = vec![
            toml::from_str::<TableDocument>(plate)?,
            toml::from_str::<TableDocument>(OBSTRUCTION)?,
        ];
        Self::from_documents(documents)
    }

    /// Parse a table set (`[[tables]]` array) from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, TableError> {
        let set: TableSetDocument = toml::from_str(contents)?;
        Self::from_documents(set.tables)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Loading transition tables from file");
        Self::from_toml_str(&contents)
    }

    pub fn from_documents(documents: Vec<TableDocument>) -> Result<Self, TableError> {
        let mut tables = HashMap::new();
        for document in documents {
            let kind = document.kind;
            let table = KindTable::from_document(document)?;
            if let Some(previous) = tables.insert(kind, table) {
                warn!(
                    kind = %kind,
                    replaced = %previous.name,
                    "Transition table defined twice; later definition wins"
                );
            }
        }

        for kind in ReportKind::ALL {
            if !tables.contains_key(&kind) {
                return Err(TableError::MissingKind(kind));
            }
        }

        Ok(Self { tables })
    }

    /// Rules out of `status` for `kind`. Unknown pairs yield an empty slice.
    pub fn rules(&self, kind: ReportKind, status: ReportStatus) -> &[TransitionRule] {
        self.tables
            .get(&kind)
            .map(|table| table.rules(status))
            .unwrap_or(&[])
    }

    pub fn kind_table(&self, kind: ReportKind) -> Option<&KindTable> {
        self.tables.get(&kind)
    }

    /// Labels administrators may choose for `kind`; empty means free text
    pub fn violation_catalogue(&self, kind: ReportKind) -> &[String] {
        self.tables
            .get(&kind)
            .map(KindTable::violation_catalogue)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(
        table: &TransitionTable,
        kind: ReportKind,
        status: ReportStatus,
    ) -> Vec<ReportStatus> {
        table.rules(kind, status).iter().map(|r| r.target).collect()
    }

    #[test]
    fn test_builtin_tables_parse_for_both_variants() {
        for variant in [PlateVariant::Reversible, PlateVariant::Investigation] {
            let table = TransitionTable::builtin(variant).unwrap();
            assert!(table.kind_table(ReportKind::IllegalParking).is_some());
            assert!(table.kind_table(ReportKind::Obstruction).is_some());
        }
    }

    #[test]
    fn test_reversible_plate_table_links_all_three_states() {
        let table = TransitionTable::builtin(PlateVariant::Reversible).unwrap();
        let kind = ReportKind::IllegalParking;

        assert_eq!(
            targets(&table, kind, ReportStatus::Pending),
            vec![ReportStatus::Approved, ReportStatus::Disapproved]
        );
        assert_eq!(
            targets(&table, kind, ReportStatus::Approved),
            vec![ReportStatus::Pending, ReportStatus::Disapproved]
        );
        assert_eq!(
            targets(&table, kind, ReportStatus::Disapproved),
            vec![ReportStatus::Pending, ReportStatus::Approved]
        );
    }

    #[test]
    fn test_investigation_plate_table_has_final_decisions() {
        let table = TransitionTable::builtin(PlateVariant::Investigation).unwrap();
        let kind = ReportKind::IllegalParking;

        assert_eq!(
            targets(&table, kind, ReportStatus::Pending),
            vec![ReportStatus::UnderInvestigation]
        );
        assert!(table
            .rules(kind, ReportStatus::UnderInvestigation)
            .iter()
            .all(|rule| rule.requires_reason));
        assert!(table.rules(kind, ReportStatus::Approved).is_empty());
        assert!(table.rules(kind, ReportStatus::Disapproved).is_empty());
    }

    #[test]
    fn test_obstruction_table_is_linear() {
        let table = TransitionTable::builtin(PlateVariant::default()).unwrap();
        let kind = ReportKind::Obstruction;

        assert_eq!(
            targets(&table, kind, ReportStatus::Pending),
            vec![ReportStatus::ReviewedForProperAction]
        );
        assert_eq!(
            targets(&table, kind, ReportStatus::ReviewedForProperAction),
            vec![ReportStatus::OngoingInvestigation]
        );
        assert_eq!(
            targets(&table, kind, ReportStatus::OngoingInvestigation),
            vec![ReportStatus::Approved, ReportStatus::Declined]
        );
        assert_eq!(
            targets(&table, kind, ReportStatus::Approved),
            vec![ReportStatus::Resolved]
        );
        assert!(table.rules(kind, ReportStatus::Resolved).is_empty());
        assert!(table.rules(kind, ReportStatus::Declined).is_empty());
    }

    #[test]
    fn test_unknown_pair_yields_empty_rules() {
        let table = TransitionTable::builtin(PlateVariant::default()).unwrap();
        assert!(table
            .rules(ReportKind::Obstruction, ReportStatus::UnderInvestigation)
            .is_empty());
    }

    #[test]
    fn test_missing_kind_is_rejected() {
        let only_plate = r#"
            [[tables]]
            version = 1
            name = "plate-only"
            kind = "IllegalParking"

            [[tables.transitions]]
            from = "Pending"
            to = "Approved"
        "#;

        let err = TransitionTable::from_toml_str(only_plate).unwrap_err();
        assert!(matches!(err, TableError::MissingKind(ReportKind::Obstruction)));
    }

    #[test]
    fn test_unguarded_investigation_exit_is_rejected() {
        let document = TableDocument {
            version: 1,
            name: "bad".to_string(),
            kind: ReportKind::Obstruction,
            violations: vec![],
            transitions: vec![TransitionDef {
                from: ReportStatus::OngoingInvestigation,
                to: ReportStatus::Approved,
                requires_reason: false,
            }],
        };

        let err = KindTable::from_document(document).unwrap_err();
        assert!(matches!(err, TableError::UnguardedInvestigationExit { .. }));
    }

    #[test]
    fn test_self_and_duplicate_transitions_are_rejected() {
        let self_loop = TableDocument {
            version: 1,
            name: "loop".to_string(),
            kind: ReportKind::Obstruction,
            violations: vec![],
            transitions: vec![TransitionDef {
                from: ReportStatus::Pending,
                to: ReportStatus::Pending,
                requires_reason: false,
            }],
        };
        assert!(matches!(
            KindTable::from_document(self_loop).unwrap_err(),
            TableError::SelfTransition(ReportStatus::Pending)
        ));

        let duplicate = TableDocument {
            version: 1,
            name: "dup".to_string(),
            kind: ReportKind::Obstruction,
            violations: vec![],
            transitions: vec![
                TransitionDef {
                    from: ReportStatus::Pending,
                    to: ReportStatus::Approved,
                    requires_reason: false,
                },
                TransitionDef {
                    from: ReportStatus::Pending,
                    to: ReportStatus::Approved,
                    requires_reason: true,
                },
            ],
        };
        assert!(matches!(
            KindTable::from_document(duplicate).unwrap_err(),
            TableError::DuplicateTarget { .. }
        ));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let document = TableDocument {
            version: 2,
            name: "future".to_string(),
            kind: ReportKind::Obstruction,
            violations: vec![],
            transitions: vec![],
        };
        assert!(matches!(
            KindTable::from_document(document).unwrap_err(),
            TableError::UnsupportedVersion { found: 2, supported: 1 }
        ));
    }

    #[test]
    fn test_obstruction_catalogue_is_fixed_and_plate_is_free_text() {
        let table = TransitionTable::builtin(PlateVariant::default()).unwrap();
        assert_eq!(
            table.violation_catalogue(ReportKind::Obstruction),
            [
                "Overnight Parking",
                "Hazard Parking",
                "Illegal Parking",
                "Towing Zone",
                "Loading and Unloading",
                "Illegal Sidewalk Use",
            ]
        );
        assert!(table.violation_catalogue(ReportKind::IllegalParking).is_empty());

        let obstruction = table.kind_table(ReportKind::Obstruction).unwrap();
        assert_eq!(obstruction.canonical_violation("towing zone"), Some("Towing Zone"));
        assert_eq!(obstruction.canonical_violation("Double Parking"), None);

        let plate = table.kind_table(ReportKind::IllegalParking).unwrap();
        assert_eq!(plate.canonical_violation("Double Parking"), Some("Double Parking"));
    }

    #[test]
    fn test_duplicate_catalogue_labels_are_rejected() {
        let document = TableDocument {
            version: 1,
            name: "dup-labels".to_string(),
            kind: ReportKind::Obstruction,
            violations: vec!["Towing Zone".to_string(), "towing zone ".to_string()],
            transitions: vec![],
        };
        assert!(matches!(
            KindTable::from_document(document).unwrap_err(),
            TableError::DuplicateViolationLabel(label) if label == "towing zone"
        ));
    }

    #[test]
    fn test_custom_table_file_replaces_builtin_rules() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tables.toml");
        std::fs::write(
            &path,
            r#"
            [[tables]]
            version = 1
            name = "plate-direct"
            kind = "IllegalParking"

            [[tables.transitions]]
            from = "Pending"
            to = "Declined"

            [[tables]]
            version = 1
            name = "obstruction-short"
            kind = "Obstruction"
            violations = ["Towing Zone"]

            [[tables.transitions]]
            from = "Pending"
            to = "Resolved"
        "#,
        )
        .unwrap();

        let table = TransitionTable::from_path(&path).unwrap();
        assert_eq!(
            targets(&table, ReportKind::IllegalParking, ReportStatus::Pending),
            vec![ReportStatus::Declined]
        );
        assert_eq!(
            targets(&table, ReportKind::Obstruction, ReportStatus::Pending),
            vec![ReportStatus::Resolved]
        );
        assert_eq!(table.violation_catalogue(ReportKind::Obstruction), ["Towing Zone"]);
        assert_eq!(table.kind_table(ReportKind::Obstruction).unwrap().name, "obstruction-short");
    }

    #[test]
    fn test_plate_variant_parsing() {
        assert_eq!("Reversible".parse::<PlateVariant>().unwrap(), PlateVariant::Reversible);
        assert_eq!(
            "plate-investigation".parse::<PlateVariant>().unwrap(),
            PlateVariant::Investigation
        );
        assert!("linear".parse::<PlateVariant>().is_err());
    }
}

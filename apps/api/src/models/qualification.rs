use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualification category. Declaration order is the fixed display and
/// aggregation order: Minimum → Preferred → Added Value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationTier {
    Minimum,
    Preferred,
    AddedValue,
}

impl QualificationTier {
    pub const ALL: [QualificationTier; 3] = [
        QualificationTier::Minimum,
        QualificationTier::Preferred,
        QualificationTier::AddedValue,
    ];

    /// Human-readable label. Used as the request section header, as the
    /// expected `qualification_type` value, and in report column names.
    pub fn label(self) -> &'static str {
        match self {
            QualificationTier::Minimum => "Minimum Qualification",
            QualificationTier::Preferred => "Preferred Qualification",
            QualificationTier::AddedValue => "Added Value",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            QualificationTier::Minimum => "MIN",
            QualificationTier::Preferred => "PREF",
            QualificationTier::AddedValue => "ADD",
        }
    }

    /// Resolves a `qualification_type` value echoed by the judgment service.
    /// Accepts the label ("Preferred Qualification") or the short tier name
    /// ("preferred", "added value"), ignoring case and surrounding whitespace.
    pub fn from_label(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['_', '-'], " ");
        QualificationTier::ALL.into_iter().find(|tier| {
            let label = tier.label().to_lowercase();
            normalized == label || normalized == label.trim_end_matches(" qualification")
        })
    }

    pub fn total_column(self) -> String {
        format!("{} Total Score", self.label())
    }
}

impl fmt::Display for QualificationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stable per-qualification identifier, e.g. `MIN-1`, `PREF-2`, `ADD-1`.
/// Derived from tier and position so it is identical across calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualificationId(String);

impl QualificationId {
    fn new(tier: QualificationTier, position: usize) -> Self {
        Self(format!("{}-{}", tier.id_prefix(), position))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QualificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single criterion of a position. `description` is kept verbatim: it is
/// sent to the judgment service unchanged and must come back byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub id: QualificationId,
    pub tier: QualificationTier,
    pub description: String,
}

/// The three ordered qualification lists of a position, with identifiers assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualificationSet {
    qualifications: Vec<Qualification>,
}

impl QualificationSet {
    pub fn from_tiers<S: Into<String>>(
        minimum: impl IntoIterator<Item = S>,
        preferred: impl IntoIterator<Item = S>,
        added_value: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut qualifications = Vec::new();
        let tiers: [(QualificationTier, Vec<String>); 3] = [
            (
                QualificationTier::Minimum,
                minimum.into_iter().map(Into::into).collect(),
            ),
            (
                QualificationTier::Preferred,
                preferred.into_iter().map(Into::into).collect(),
            ),
            (
                QualificationTier::AddedValue,
                added_value.into_iter().map(Into::into).collect(),
            ),
        ];
        for (tier, descriptions) in tiers {
            for (index, description) in descriptions.into_iter().enumerate() {
                qualifications.push(Qualification {
                    id: QualificationId::new(tier, index + 1),
                    tier,
                    description,
                });
            }
        }
        Self { qualifications }
    }

    /// All qualifications, tier order first, then input order within a tier.
    pub fn iter(&self) -> impl Iterator<Item = &Qualification> {
        self.qualifications.iter()
    }

    pub fn tier(&self, tier: QualificationTier) -> impl Iterator<Item = &Qualification> {
        self.qualifications.iter().filter(move |q| q.tier == tier)
    }

    pub fn get(&self, id: &QualificationId) -> Option<&Qualification> {
        self.qualifications.iter().find(|q| &q.id == id)
    }

    /// Position of `id` in iteration order.
    pub fn index_of(&self, id: &QualificationId) -> Option<usize> {
        self.qualifications.iter().position(|q| &q.id == id)
    }

    pub fn len(&self) -> usize {
        self.qualifications.len()
    }
}

/// Points awarded per satisfied qualification in each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub minimum: u32,
    pub preferred: u32,
    pub added_value: u32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            minimum: 1,
            preferred: 2,
            added_value: 3,
        }
    }
}

impl ScoreConfig {
    pub fn points_for(&self, tier: QualificationTier) -> u32 {
        match tier {
            QualificationTier::Minimum => self.minimum,
            QualificationTier::Preferred => self.preferred,
            QualificationTier::AddedValue => self.added_value,
        }
    }
}

/// A position's screening criteria as supplied by the caller.
#[derive(Debug, Clone)]
pub struct Position {
    pub name: String,
    pub qualifications: QualificationSet,
    pub scores: ScoreConfig,
}

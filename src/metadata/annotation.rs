use serde::{Deserialize, Serialize};

use super::SegmentId;
use crate::util::color::{self, Rgb};

/// Identification of the entry an annotation belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AnnotatedEntry {
    /// Source database name (e.g. `emdb`).
    pub source_db_name: String,
    /// Id within the source database (e.g. `emd-1832`).
    pub source_db_id: String,
}

/// Link from a segment to an external ontology or database record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ExternalReference {
    /// Reference id within the annotation.
    pub id: Option<i64>,
    /// Resource name (e.g. `GO`, `UniProt`).
    pub resource: Option<String>,
    /// Accession within the resource.
    pub accession: Option<String>,
    /// Short label.
    pub label: Option<String>,
    /// Free text description.
    pub description: Option<String>,
}

/// Biological description of a segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct BiologicalAnnotation {
    /// Display name.
    pub name: Option<String>,
    /// External references.
    pub external_references: Vec<ExternalReference>,
}

/// One named, colored region of an entry's segmentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Segment id, unique within an annotation.
    pub id: SegmentId,
    /// Normalized RGB or RGBA display color.
    #[serde(default, alias = "color")]
    pub colour: Vec<f32>,
    /// Biological description.
    #[serde(default)]
    pub biological_annotation: Option<BiologicalAnnotation>,
}

impl Segment {
    /// Create a segment with a color and no description.
    #[must_use]
    pub fn new(id: SegmentId, colour: Vec<f32>) -> Self {
        Self {
            id,
            colour,
            biological_annotation: None,
        }
    }

    /// Display name, if annotated.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.biological_annotation
            .as_ref()
            .and_then(|a| a.name.as_deref())
    }

    /// RGB color, or `fallback` when fewer than 3 components are given.
    #[must_use]
    pub fn color_or(&self, fallback: Rgb) -> Rgb {
        color::from_normalized(&self.colour).unwrap_or(fallback)
    }
}

/// Human annotations of an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Annotation {
    /// Entry the annotation describes.
    pub entry_id: Option<AnnotatedEntry>,
    /// Segments in display order.
    pub segment_list: Vec<Segment>,
    /// Free text details about the entry.
    pub details: Option<String>,
}

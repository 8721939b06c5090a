//! Core types for manga-dl

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

use crate::config::{PackConfig, PageQuality};
use crate::error::Error;
use crate::utils::natural_cmp;

/// Label used for chapters that do not belong to any volume
pub const NO_VOLUME: &str = "No Volume";

/// Label used for chapters without a publishing group
pub const NO_GROUP: &str = "No Group";

/// Label used when a group's display name could not be resolved
pub const UNKNOWN_GROUP: &str = "Unknown Group";

/// Label used for chapters without a chapter number
pub const UNKNOWN_CHAPTER: &str = "unknown";

/// Volume a chapter belongs to
///
/// Volumes order naturally by label ("2" before "10") with [`Volume::Unassigned`] last.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum Volume {
    /// A labeled volume, usually numeric ("1", "12", "3.5")
    Labeled(String),
    /// The chapter is not part of any volume
    Unassigned,
}

impl Volume {
    /// Label used in names and logs
    pub fn label(&self) -> &str {
        match self {
            Volume::Labeled(label) => label,
            Volume::Unassigned => NO_VOLUME,
        }
    }

    /// Whether this is the "no volume" bucket
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Volume::Unassigned)
    }
}

impl From<Option<String>> for Volume {
    fn from(label: Option<String>) -> Self {
        match label {
            Some(label) if !label.trim().is_empty() => Volume::Labeled(label),
            _ => Volume::Unassigned,
        }
    }
}

impl From<Volume> for Option<String> {
    fn from(volume: Volume) -> Self {
        match volume {
            Volume::Labeled(label) => Some(label),
            Volume::Unassigned => None,
        }
    }
}

impl Ord for Volume {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Volume::Labeled(a), Volume::Labeled(b)) => natural_cmp(a, b),
            (Volume::Labeled(_), Volume::Unassigned) => Ordering::Less,
            (Volume::Unassigned, Volume::Labeled(_)) => Ordering::Greater,
            (Volume::Unassigned, Volume::Unassigned) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Volume {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Publishing group credited for a chapter
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum GroupId {
    /// Group identifier as known by the content source
    Id(String),
    /// The chapter has no credited group
    Unassigned,
}

impl GroupId {
    /// The identifier, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            GroupId::Id(id) => Some(id),
            GroupId::Unassigned => None,
        }
    }
}

impl From<Option<String>> for GroupId {
    fn from(id: Option<String>) -> Self {
        match id {
            Some(id) if !id.trim().is_empty() => GroupId::Id(id),
            _ => GroupId::Unassigned,
        }
    }
}

impl From<GroupId> for Option<String> {
    fn from(group: GroupId) -> Self {
        match group {
            GroupId::Id(id) => Some(id),
            GroupId::Unassigned => None,
        }
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupId::Id(id) => f.write_str(id),
            GroupId::Unassigned => f.write_str(NO_GROUP),
        }
    }
}

/// One downloadable chapter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter identifier in the content source
    pub id: String,

    /// Chapter number label ("7", "7.5"), if known
    #[serde(default)]
    pub number: Option<String>,

    /// Volume the chapter belongs to
    #[serde(default = "unassigned_volume")]
    pub volume: Volume,

    /// Translated language code ("en", "pt-br")
    pub language: String,

    /// Set when the chapter is hosted elsewhere and has no pages to download
    #[serde(default)]
    pub external_url: Option<String>,

    /// Publishing group credited for the chapter
    #[serde(default = "unassigned_group")]
    pub group: GroupId,
}

fn unassigned_volume() -> Volume {
    Volume::Unassigned
}

fn unassigned_group() -> GroupId {
    GroupId::Unassigned
}

impl Chapter {
    /// Chapter number label, "unknown" when absent
    pub fn number(&self) -> &str {
        match self.number.as_deref() {
            Some(number) if !number.trim().is_empty() => number,
            _ => UNKNOWN_CHAPTER,
        }
    }

    /// Chapter number parsed as a float, if it is numeric
    pub fn numeric(&self) -> Option<f64> {
        self.number
            .as_deref()
            .and_then(|n| n.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
    }

    /// Whether the chapter redirects to an external site instead of hosting pages
    pub fn is_external(&self) -> bool {
        self.external_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Page locations for one chapter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSet {
    /// Host serving the page images
    pub base_url: String,
    /// Content hash of the chapter on that host
    pub hash: String,
    /// Page file names in reading order
    pub files: Vec<String>,
    /// Image set the file names belong to
    #[serde(default)]
    pub quality: PageQuality,
}

impl PageSet {
    /// Full URL of one page file
    pub fn page_url(&self, file: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.quality.path_segment(),
            self.hash,
            file
        )
    }

    /// Page file names with repeats removed, first occurrence wins
    pub fn unique_files(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::with_capacity(self.files.len());
        self.files
            .iter()
            .filter(|file| seen.insert(file.as_str()))
            .cloned()
            .collect()
    }
}

/// Deliverable produced for a job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// Page images written straight into a folder
    Loose,
    /// Compressed archive of the page images (default)
    #[default]
    Archive,
    /// PDF document with one page per image
    Document,
}

impl ArtifactFormat {
    /// File extension of the artifact, `None` for loose folders
    pub fn extension<'a>(&self, pack: &'a PackConfig) -> Option<&'a str> {
        match self {
            ArtifactFormat::Loose => None,
            ArtifactFormat::Archive => Some(pack.archive_extension.as_str()),
            ArtifactFormat::Document => Some("pdf"),
        }
    }
}

/// Request to download a single chapter
#[derive(Clone, Debug)]
pub struct ChapterRequest {
    /// Manga display name used in output names
    pub manga: String,
    /// The chapter to download
    pub chapter: Chapter,
    /// Target language code used in output names
    pub language: String,
    /// Directory receiving the artifact
    pub out_dir: PathBuf,
    /// Artifact format
    pub format: ArtifactFormat,
}

/// Request to download one (volume, group) bucket as a single artifact
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// Manga display name used in output names
    pub manga: String,
    /// Volume label
    pub volume: Volume,
    /// Publishing group of the bucket
    pub group: GroupId,
    /// Resolved display name of the publishing group
    pub group_name: String,
    /// Chapters of the bucket, in download order
    pub chapters: Vec<Chapter>,
    /// Target language code used in output names
    pub language: String,
    /// Directory receiving the artifact
    pub out_dir: PathBuf,
    /// Artifact format
    pub format: ArtifactFormat,
    /// With [`ArtifactFormat::Document`], write one document per chapter instead of one per volume
    pub document_per_chapter: bool,
}

/// What a job left in the output directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Artifact {
    /// Pages were written into this folder
    Folder(PathBuf),
    /// These archive or document files were written
    Files(Vec<PathBuf>),
    /// Nothing hosted was downloaded (external chapters only)
    Nothing,
}

/// Outcome of a successful chapter or volume job
#[derive(Debug)]
pub struct JobReport {
    /// What was produced
    pub artifact: Artifact,
    /// Chapters skipped after exhausting their retries
    pub failed_chapters: Vec<Error>,
}

impl JobReport {
    /// Report for a job where every chapter succeeded
    pub fn complete(artifact: Artifact) -> Self {
        Self {
            artifact,
            failed_chapters: Vec::new(),
        }
    }
}

//! Chapter grouping by volume and publishing group
//!
//! Volume mode packs every (volume, group) bucket into its own artifact. This module builds
//! those buckets, resolves group display names through a shared cache and turns the
//! buckets a caller picked into [`DownloadJob`]s.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::source::ContentSource;
use crate::types::{ArtifactFormat, Chapter, DownloadJob, GroupId, NO_GROUP, UNKNOWN_GROUP, Volume};

/// Chapters partitioned by volume, then by publishing group
///
/// Volumes iterate in natural order with [`Volume::Unassigned`] last. Chapters keep their
/// input order inside each bucket.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeGroupIndex {
    buckets: BTreeMap<Volume, BTreeMap<GroupId, Vec<Chapter>>>,
}

impl VolumeGroupIndex {
    /// Volumes present in the index, naturally ordered, "no volume" last
    pub fn volumes(&self) -> Vec<&Volume> {
        self.buckets.keys().collect()
    }

    /// Group buckets of one volume
    pub fn groups(&self, volume: &Volume) -> Option<&BTreeMap<GroupId, Vec<Chapter>>> {
        self.buckets.get(volume)
    }

    /// Iterate over `(volume, groups)` in volume order
    pub fn iter(&self) -> impl Iterator<Item = (&Volume, &BTreeMap<GroupId, Vec<Chapter>>)> {
        self.buckets.iter()
    }

    /// Total number of chapters across all buckets
    pub fn chapter_count(&self) -> usize {
        self.buckets
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    /// Whether the index holds no chapters
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Partition chapters into (volume, group) buckets in a single pass
pub fn group_chapters<'a, I>(chapters: I) -> VolumeGroupIndex
where
    I: IntoIterator<Item = &'a Chapter>,
{
    let mut buckets: BTreeMap<Volume, BTreeMap<GroupId, Vec<Chapter>>> = BTreeMap::new();
    for chapter in chapters {
        buckets
            .entry(chapter.volume.clone())
            .or_default()
            .entry(chapter.group.clone())
            .or_default()
            .push(chapter.clone());
    }
    VolumeGroupIndex { buckets }
}

/// Sort chapters by numeric chapter number, ascending
///
/// Chapters whose number is missing or not numeric go last. The sort is stable.
pub fn sort_chapters_by_number(chapters: &mut [Chapter]) {
    chapters.sort_by(|a, b| {
        let a = a.numeric().unwrap_or(f64::INFINITY);
        let b = b.numeric().unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
}

/// Cache of publishing group display names
///
/// Owned by the downloader and shared by every job it runs. Lookups that fail are cached as
/// [`UNKNOWN_GROUP`] so a flaky group endpoint is queried once per group.
#[derive(Debug, Default)]
pub struct GroupNameCache {
    names: RwLock<HashMap<String, String>>,
}

impl GroupNameCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Display name of the group credited for `chapter`
    pub async fn resolve(&self, chapter: &Chapter, source: &dyn ContentSource) -> String {
        let Some(group_id) = chapter.group.id() else {
            return NO_GROUP.to_string();
        };

        if let Some(name) = self.names.read().await.get(group_id) {
            return name.clone();
        }

        let name = match source.group_name(group_id).await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => {
                tracing::debug!(group = %group_id, "group has no display name");
                UNKNOWN_GROUP.to_string()
            }
            Err(e) => {
                tracing::warn!(group = %group_id, error = %e, "group name lookup failed");
                UNKNOWN_GROUP.to_string()
            }
        };

        // Concurrent lookups of the same group may race; the first write wins
        self.names
            .write()
            .await
            .entry(group_id.to_string())
            .or_insert(name)
            .clone()
    }

    /// Number of cached groups
    pub async fn len(&self) -> usize {
        self.names.read().await.len()
    }

    /// Whether nothing has been cached yet
    pub async fn is_empty(&self) -> bool {
        self.names.read().await.is_empty()
    }
}

/// Settings shared by every job planned from one index
#[derive(Clone, Debug)]
pub struct JobSettings {
    /// Manga display name used in output names
    pub manga: String,
    /// Target language code used in output names
    pub language: String,
    /// Directory receiving the artifacts
    pub out_dir: PathBuf,
    /// Artifact format
    pub format: ArtifactFormat,
    /// With documents, write one document per chapter
    pub document_per_chapter: bool,
}

/// Jobs planned for the volumes a caller picked
#[derive(Clone, Debug, Default)]
pub struct VolumePlan {
    /// One job per (volume, group) bucket of the labeled volumes
    pub jobs: Vec<DownloadJob>,
    /// Chapters of the "no volume" bucket, to be downloaded in chapter mode
    pub unassigned: Vec<Chapter>,
}

/// Turn picked volumes into volume jobs
///
/// Every non-empty (volume, group) bucket of a picked labeled volume becomes one job with the
/// group name resolved through `cache`. Chapters without a volume cannot form a volume
/// artifact and are returned separately, in bucket order. Picked volumes absent from the
/// index are ignored.
pub async fn plan_volume_jobs(
    index: &VolumeGroupIndex,
    picked: &[Volume],
    settings: &JobSettings,
    cache: &GroupNameCache,
    source: &dyn ContentSource,
) -> VolumePlan {
    let mut plan = VolumePlan::default();

    for volume in picked {
        let Some(groups) = index.groups(volume) else {
            tracing::debug!(volume = %volume, "picked volume not in index");
            continue;
        };

        if volume.is_unassigned() {
            plan.unassigned.extend(groups.values().flatten().cloned());
            continue;
        }

        for (group, chapters) in groups {
            let Some(first) = chapters.first() else {
                continue;
            };
            let group_name = cache.resolve(first, source).await;

            plan.jobs.push(DownloadJob {
                manga: settings.manga.clone(),
                volume: volume.clone(),
                group: group.clone(),
                group_name,
                chapters: chapters.clone(),
                language: settings.language.clone(),
                out_dir: settings.out_dir.clone(),
                format: settings.format,
                document_per_chapter: settings.document_per_chapter,
            });
        }
    }

    plan
}

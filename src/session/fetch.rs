//! Fetch phase of a load: every request and decode, no session access.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::LoadMode;
use super::SegmentFilter;
use crate::api::{MeshData, VolumePayload, VolumeRequest, VolumeServer};
use crate::entry::EntryId;
use crate::error::{FailureScope, PartialFailure, VolsegError};
use crate::metadata::{detail, DetailLevel, Metadata, SegmentId};
use crate::options::Options;
use crate::segmentation::{LatticeSegmentation, SEGMENTATION_BLOCK};
use crate::table::{find_block, log_block_overview};
use crate::volume::Volume;

/// Options snapshot a fetch runs with.
#[derive(Debug, Clone)]
pub(super) struct FetchSettings {
    request: VolumeRequest,
    image_request: VolumeRequest,
    volume_requires_lattice: bool,
    background_segments: Vec<SegmentId>,
    preferred_detail: Option<DetailLevel>,
}

impl FetchSettings {
    pub(super) fn from_options(options: &Options) -> Self {
        let request = options.api.volume_request();
        let image_request = VolumeRequest {
            max_voxels: options.loading.image_max_voxels,
            ..request.clone()
        };
        Self {
            request,
            image_request,
            volume_requires_lattice: options.loading.volume_requires_lattice,
            background_segments: options.segments.background_segments.clone(),
            preferred_detail: options.segments.preferred_detail,
        }
    }
}

/// Permission to apply one load, issued by
/// [`Session::begin_load`](super::Session::begin_load).
///
/// A ticket is applied at most once.
#[derive(Debug)]
pub struct LoadTicket {
    pub(super) generation: u64,
    pub(super) entry: EntryId,
    pub(super) mode: LoadMode,
    pub(super) settings: FetchSettings,
}

impl LoadTicket {
    /// Load generation the ticket was issued for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Entry to load.
    #[must_use]
    pub fn entry(&self) -> &EntryId {
        &self.entry
    }

    /// Load mode.
    #[must_use]
    pub fn mode(&self) -> LoadMode {
        self.mode
    }
}

/// Mesh geometry of one segment.
#[derive(Debug, Clone)]
pub(super) struct SegmentMesh {
    pub(super) detail: DetailLevel,
    pub(super) meshes: Arc<[MeshData]>,
}

/// Everything fetched for an entry whose metadata loaded.
#[derive(Debug)]
pub struct EntryData {
    pub(super) metadata: Metadata,
    pub(super) volume: Option<Arc<Volume>>,
    pub(super) segmentation: Option<Arc<LatticeSegmentation>>,
    /// Show the density volume (it may be present only as a lattice grid).
    pub(super) show_volume: bool,
    pub(super) stream_meshes: bool,
    pub(super) prefetched:
        FxHashMap<SegmentId, Result<SegmentMesh, VolsegError>>,
    pub(super) failures: Vec<PartialFailure>,
}

impl EntryData {
    fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            volume: None,
            segmentation: None,
            show_volume: false,
            stream_meshes: false,
            prefetched: FxHashMap::default(),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, scope: FailureScope, error: VolsegError) {
        log::warn!("{scope}: {error}");
        self.failures.push(PartialFailure { scope, error });
    }

    /// Metadata as loaded (after background segments were dropped).
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Branches that failed without aborting the load.
    #[must_use]
    pub fn failures(&self) -> &[PartialFailure] {
        &self.failures
    }
}

/// Result of the fetch phase, to be passed to
/// [`Session::finish_load`](super::Session::finish_load).
#[derive(Debug)]
pub struct FetchedEntry {
    pub(super) ticket: LoadTicket,
    pub(super) result: Result<EntryData, VolsegError>,
}

impl FetchedEntry {
    /// The ticket this fetch ran for.
    #[must_use]
    pub fn ticket(&self) -> &LoadTicket {
        &self.ticket
    }

    /// Fetched data, or the error that aborted the load.
    #[must_use]
    pub fn result(&self) -> Result<&EntryData, &VolsegError> {
        self.result.as_ref()
    }
}

/// Run the fetch phase of a load.
///
/// Metadata failures abort; failures of independent branches (volume,
/// lattice, single mesh segments) are collected in the result instead.
#[must_use]
pub fn fetch_entry(api: &dyn VolumeServer, ticket: LoadTicket) -> FetchedEntry {
    let result = fetch_data(api, &ticket);
    FetchedEntry { ticket, result }
}

fn fetch_data(
    api: &dyn VolumeServer,
    ticket: &LoadTicket,
) -> Result<EntryData, VolsegError> {
    let entry = &ticket.entry;
    let settings = &ticket.settings;

    if ticket.mode == LoadMode::Image {
        // Image entries carry no annotation.
        let mut data = EntryData::new(Metadata::default());
        fetch_image(api, entry, &settings.image_request, &mut data);
        return Ok(data);
    }

    log::info!("{entry}: fetching metadata");
    let metadata = api.metadata(entry)?;
    metadata.validate()?;
    let mut data = EntryData::new(metadata);

    match ticket.mode {
        LoadMode::Volume => {
            fetch_payload(api, entry, &settings.request, true, true, &mut data);
        }
        LoadMode::Meshes(filter) => {
            if filter == SegmentFilter::Foreground {
                data.metadata.drop_segments(&settings.background_segments);
            }
            prefetch_meshes(api, entry, settings.preferred_detail, &mut data);
        }
        LoadMode::MeshStreaming => data.stream_meshes = true,
        LoadMode::Auto => {
            let has_lattices = data.metadata.has_lattices();
            let has_meshes = data.metadata.has_meshes();
            let mut has_volumes = data.metadata.has_volumes();
            if has_volumes && !has_lattices && settings.volume_requires_lattice
            {
                log::warn!(
                    "{entry}: no lattice segmentation, not showing the volume"
                );
                has_volumes = false;
            }
            log::info!(
                "{entry}: volumes {has_volumes}, lattices {has_lattices}, meshes {has_meshes}"
            );
            fetch_payload(
                api,
                entry,
                &settings.request,
                has_volumes,
                has_lattices,
                &mut data,
            );
            data.stream_meshes = has_meshes;
        }
        LoadMode::Image => {}
    }
    Ok(data)
}

/// Fetch the volume payload once and feed the volume and lattice branches.
fn fetch_payload(
    api: &dyn VolumeServer,
    entry: &EntryId,
    request: &VolumeRequest,
    want_volume: bool,
    want_lattice: bool,
    data: &mut EntryData,
) {
    if !want_volume && !want_lattice {
        return;
    }
    let VolumePayload { volume, blocks } =
        match api.volume_payload(entry, request) {
            Ok(payload) => payload,
            Err(e) => {
                if want_volume && want_lattice {
                    data.fail(
                        FailureScope::Lattice,
                        VolsegError::Fetch(e.to_string()),
                    );
                }
                let scope = if want_volume {
                    FailureScope::Volume
                } else {
                    FailureScope::Lattice
                };
                data.fail(scope, e);
                return;
            }
        };
    let volume = volume.map(Arc::new);

    if want_lattice {
        log_block_overview(&entry.to_string(), &blocks);
        match find_block(&blocks, SEGMENTATION_BLOCK) {
            None => {
                let missing = VolsegError::MissingSegmentationBlock(
                    SEGMENTATION_BLOCK.to_owned(),
                );
                log::warn!("{entry}: {missing}, not showing segmentation");
            }
            Some(block) => match &volume {
                None => data.fail(FailureScope::Lattice, VolsegError::MissingGrid),
                Some(v) => match LatticeSegmentation::from_block(block, &v.grid) {
                    Ok(segmentation) => {
                        data.segmentation = Some(Arc::new(segmentation));
                    }
                    Err(e) => data.fail(FailureScope::Lattice, e),
                },
            },
        }
    }

    if want_volume {
        if volume.is_none() {
            data.fail(
                FailureScope::Volume,
                VolsegError::Decode("payload has no density volume".to_owned()),
            );
        }
        data.show_volume = volume.is_some();
    }
    data.volume = volume;
}

fn fetch_image(
    api: &dyn VolumeServer,
    entry: &EntryId,
    request: &VolumeRequest,
    data: &mut EntryData,
) {
    match api.volume_payload(entry, request) {
        Ok(VolumePayload {
            volume: Some(volume),
            ..
        }) => {
            data.volume = Some(Arc::new(volume));
            data.show_volume = true;
        }
        Ok(_) => data.fail(
            FailureScope::Volume,
            VolsegError::Decode("payload has no image volume".to_owned()),
        ),
        Err(e) => data.fail(FailureScope::Volume, e),
    }
}

fn prefetch_meshes(
    api: &dyn VolumeServer,
    entry: &EntryId,
    preferred: Option<DetailLevel>,
    data: &mut EntryData,
) {
    let ids: Vec<SegmentId> = data
        .metadata
        .annotation
        .segment_list
        .iter()
        .map(|s| s.id)
        .collect();
    for id in ids {
        let mesh = fetch_segment_mesh(api, entry, &data.metadata, id, preferred);
        let _ = data.prefetched.insert(id, mesh);
    }
    log::info!("{entry}: prefetched meshes of {} segments", data.prefetched.len());
}

/// Resolve the detail level of one segment and fetch its meshes.
pub(super) fn fetch_segment_mesh(
    api: &dyn VolumeServer,
    entry: &EntryId,
    metadata: &Metadata,
    segment: SegmentId,
    preferred: Option<DetailLevel>,
) -> Result<SegmentMesh, VolsegError> {
    let detail = detail::sufficient_detail_or_coarsest(
        segment,
        &metadata.mesh_segment_details(segment),
        preferred,
    )?;
    let meshes = api.meshes(entry, segment, detail)?;
    log::debug!(
        "segment {segment}: {} meshes at detail {detail}",
        meshes.len()
    );
    Ok(SegmentMesh {
        detail,
        meshes: meshes.into(),
    })
}

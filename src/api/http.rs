use super::{
    ApiUrls, MeshData, PayloadDecoder, VolumePayload, VolumeRequest,
    VolumeServer,
};
use crate::entry::EntryId;
use crate::error::VolsegError;
use crate::metadata::{DetailLevel, Metadata, SegmentId};

/// Blocking HTTP client for a volume server.
pub struct HttpVolumeServer {
    agent: ureq::Agent,
    urls: ApiUrls,
    decoder: Option<Box<dyn PayloadDecoder>>,
}

impl HttpVolumeServer {
    /// Client for the server at `base_url` (e.g. `http://localhost:9000/v1`).
    ///
    /// Without a [`PayloadDecoder`] volume payload requests fail with
    /// [`VolsegError::Decode`]; metadata, meshes and listings still work.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            urls: ApiUrls::new(base_url),
            decoder: None,
        }
    }

    /// Attach the decoder used for volume payloads.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Box<dyn PayloadDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Server version string.
    pub fn version(&self) -> Result<String, VolsegError> {
        self.get_text(&self.urls.version())
    }

    fn get_text(&self, url: &str) -> Result<String, VolsegError> {
        log::debug!("GET {url}");
        self.agent
            .get(url)
            .call()
            .map_err(|e| VolsegError::Fetch(format!("{url}: {e}")))?
            .into_body()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| VolsegError::Fetch(format!("{url}: {e}")))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, VolsegError> {
        log::debug!("GET {url}");
        self.agent
            .get(url)
            .call()
            .map_err(|e| VolsegError::Fetch(format!("{url}: {e}")))?
            .into_body()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| VolsegError::Fetch(format!("{url}: {e}")))
    }
}

impl VolumeServer for HttpVolumeServer {
    fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    fn metadata(&self, entry: &EntryId) -> Result<Metadata, VolsegError> {
        Metadata::from_json(&self.get_text(&self.urls.metadata(entry))?)
    }

    fn volume_payload(
        &self,
        entry: &EntryId,
        request: &VolumeRequest,
    ) -> Result<VolumePayload, VolsegError> {
        let Some(decoder) = &self.decoder else {
            return Err(VolsegError::Decode(
                "no BinaryCIF decoder configured".to_owned(),
            ));
        };
        let bytes = self.get_bytes(&self.urls.volume(entry, request))?;
        log::debug!("{entry}: {} payload bytes", bytes.len());
        decoder.decode(&bytes)
    }

    fn meshes(
        &self,
        entry: &EntryId,
        segment: SegmentId,
        detail: DetailLevel,
    ) -> Result<Vec<MeshData>, VolsegError> {
        let text = self.get_text(&self.urls.mesh(entry, segment, detail))?;
        let meshes: Vec<MeshData> = serde_json::from_str(&text)?;
        for mesh in &meshes {
            mesh.validate()?;
        }
        Ok(meshes)
    }

    fn list_entries(
        &self,
        limit: usize,
        keyword: Option<&str>,
    ) -> Result<Vec<String>, VolsegError> {
        let text = self.get_text(&self.urls.list_entries(limit, keyword))?;
        Ok(serde_json::from_str(&text)?)
    }
}

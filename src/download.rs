use camino::Utf8Path;
use serde::Serialize;
use tempfile::Builder;
use tracing::debug;

use crate::domain::AssetReference;
use crate::error::CatalogError;
use crate::naming::decoded_path;
use crate::seatable::SeatableClient;

const ASSET_MARKER: &str = "asset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DownloadOutcome {
    Cached,
    Downloaded { bytes: u64 },
}

/// Path of the asset inside its base: everything after `asset/<base-uuid>`,
/// with a leading slash.
pub fn asset_path(reference: &AssetReference) -> Result<String, CatalogError> {
    let path = decoded_path(reference);
    let segments = path.split('/').collect::<Vec<_>>();
    let marker = segments
        .iter()
        .position(|segment| *segment == ASSET_MARKER)
        .ok_or_else(|| CatalogError::Resolve {
            reference: reference.to_string(),
            reason: format!("missing /{ASSET_MARKER}/ segment"),
        })?;
    let rest = segments.get(marker + 2..).unwrap_or_default();
    let has_base = segments
        .get(marker + 1)
        .map(|segment| !segment.is_empty())
        .unwrap_or(false);
    if !has_base || rest.iter().all(|segment| segment.is_empty()) {
        return Err(CatalogError::Resolve {
            reference: reference.to_string(),
            reason: "no file path after the asset root".to_string(),
        });
    }
    Ok(format!("/{}", rest.join("/")))
}

pub struct AssetDownloader<'a, C: SeatableClient> {
    client: &'a C,
}

impl<'a, C: SeatableClient> AssetDownloader<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Downloads `reference` to `target` unless the file is already there.
    /// The body goes to a temp file in the same directory that only takes the
    /// final name once fully written.
    pub fn download(
        &self,
        reference: &AssetReference,
        target: &Utf8Path,
    ) -> Result<DownloadOutcome, CatalogError> {
        if target.as_std_path().exists() {
            debug!(path = %target, "asset already present");
            return Ok(DownloadOutcome::Cached);
        }

        let path = asset_path(reference)?;
        let link = self.client.download_link(&path)?;

        let parent = target
            .parent()
            .ok_or_else(|| CatalogError::Filesystem(format!("invalid asset path {target}")))?;
        let mut temp = Builder::new()
            .prefix(".asset-")
            .suffix(".part")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        let bytes = self.client.fetch_asset(&link, temp.as_file_mut())?;
        temp.as_file()
            .sync_all()
            .map_err(|err| CatalogError::Transfer(err.to_string()))?;
        temp.persist(target.as_std_path())
            .map_err(|err| CatalogError::Filesystem(err.to_string()))?;
        Ok(DownloadOutcome::Downloaded { bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn asset_path_strips_marker_and_base() {
        let reference = AssetReference::new(
            "https://cloud.seatable.io/workspace/42/asset/3f1c-uuid/images/2023-04/My%20Photo.jpg",
        );
        assert_eq!(
            asset_path(&reference).unwrap(),
            "/images/2023-04/My Photo.jpg"
        );
    }

    #[test]
    fn asset_path_requires_marker() {
        let reference = AssetReference::new("https://example.com/images/a.jpg");
        assert_matches!(asset_path(&reference), Err(CatalogError::Resolve { .. }));
    }

    #[test]
    fn asset_path_requires_file_after_base() {
        let reference = AssetReference::new("https://example.com/asset/uuid/");
        assert_matches!(asset_path(&reference), Err(CatalogError::Resolve { .. }));
    }
}

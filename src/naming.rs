use md5::{Digest, Md5};
use percent_encoding::percent_decode_str;
use reqwest::Url;

use crate::domain::AssetReference;

const HASH_LEN: usize = 12;

/// Decoded path component of an asset reference. Absolute URLs contribute
/// only their path; bare paths have any query or fragment cut off.
pub fn decoded_path(reference: &AssetReference) -> String {
    let raw = reference.as_str();
    let encoded = match Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    percent_decode_str(&encoded).decode_utf8_lossy().into_owned()
}

/// Local filename for an asset: a short hash of the decoded path plus the
/// original extension of the final segment.
pub fn asset_filename(reference: &AssetReference) -> String {
    let path = decoded_path(reference);
    format!("{}{}", path_hash(&path), extension(&path))
}

fn path_hash(path: &str) -> String {
    let digest = Md5::digest(path.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(HASH_LEN);
    encoded
}

fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or_default();
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => &name[idx..],
        _ => "",
    }
}

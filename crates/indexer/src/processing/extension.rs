//! Header-extension sidecar extraction.
//!
//! The data-availability header attaches a JSON sidecar keyed by payload
//! version. It is parsed once into a typed structure and fanned out into the
//! HeaderExtension/Commitment/AppLookup triple; untyped JSON never travels
//! further down the pipeline.

use serde::Deserialize;
use serde_json::Value;

use crate::entities::{AppLookupRecord, CommitmentRecord, HeaderExtensionRecord};

use super::BuildError;

#[derive(Debug, Deserialize)]
struct ExtensionSidecar {
    v1: Option<ExtensionPayload>,
    v2: Option<ExtensionPayload>,
    v3: Option<ExtensionPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionPayload {
    commitment: CommitmentPayload,
    app_lookup: AppLookupPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitmentPayload {
    rows: u32,
    cols: u32,
    data_root: Option<String>,
    commitment: String,
}

#[derive(Debug, Deserialize)]
struct AppLookupPayload {
    size: u32,
    index: Value,
}

#[derive(Debug)]
pub struct ExtensionTriple {
    pub extension: HeaderExtensionRecord,
    pub commitment: CommitmentRecord,
    pub lookup: AppLookupRecord,
}

/// Parse the sidecar, if any, into the record triple for this block.
///
/// The newest version key present wins. A sidecar that parses but carries no
/// recognized version is a schema mismatch and fails hard.
pub fn build_extension(
    height: u64,
    sidecar: Option<&str>,
) -> Result<Option<ExtensionTriple>, BuildError> {
    let Some(raw) = sidecar else {
        return Ok(None);
    };

    let parsed: ExtensionSidecar = serde_json::from_str(raw)?;
    let (version, payload) = if let Some(payload) = parsed.v3 {
        ("v3", payload)
    } else if let Some(payload) = parsed.v2 {
        ("v2", payload)
    } else if let Some(payload) = parsed.v1 {
        ("v1", payload)
    } else {
        return Err(BuildError::UnknownExtensionVersion);
    };

    let block_id = height.to_string();

    let extension = HeaderExtensionRecord {
        id: block_id.clone(),
        block_height: height,
        version: version.to_string(),
    };

    let commitment = CommitmentRecord {
        id: block_id.clone(),
        block_height: height,
        header_extension_id: extension.id.clone(),
        rows: payload.commitment.rows,
        cols: payload.commitment.cols,
        data_root: payload.commitment.data_root,
        commitment: payload.commitment.commitment,
    };

    let lookup = AppLookupRecord {
        id: block_id,
        block_height: height,
        header_extension_id: extension.id.clone(),
        size: payload.app_lookup.size,
        index: payload.app_lookup.index.to_string(),
    };

    Ok(Some(ExtensionTriple {
        extension,
        commitment,
        lookup,
    }))
}

//! Native items and their byte encoding.

use crate::error::{CodecError, CodecResult};
use crate::value::NativeValue;
use std::collections::BTreeMap;

/// A stored item: attribute name to tagged value.
///
/// A `BTreeMap` keeps attribute order deterministic, so identical items
/// always encode to identical bytes.
pub type NativeItem = BTreeMap<String, NativeValue>;

/// Encodes an item to CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serialization fails.
pub fn encode_item(item: &NativeItem) -> CodecResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(item, &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decodes an item from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] if the bytes are not a valid
/// encoded item.
pub fn decode_item(bytes: &[u8]) -> CodecResult<NativeItem> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

//! Encode/decode helpers for the packet layer.
//!
//! Binary framing uses MessagePack, the debug/admin surface uses JSON. The
//! core hands view structs to these helpers and never sees wire bytes.

use rmp_serde::{decode, encode};
use thiserror::Error;

use crate::{AllianceInfo, RangeView, TileView, TradeFill, TradeListing};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[from] encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] decode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn serialize_range_view(view: &RangeView) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(view)?)
}

pub fn deserialize_range_view(bytes: &[u8]) -> Result<RangeView, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_tile_view(view: &TileView) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(view)?)
}

pub fn deserialize_tile_view(bytes: &[u8]) -> Result<TileView, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_alliance_info(info: &AllianceInfo) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(info)?)
}

pub fn deserialize_alliance_info(bytes: &[u8]) -> Result<AllianceInfo, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_listings(listings: &[TradeListing]) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(listings)?)
}

pub fn deserialize_listings(bytes: &[u8]) -> Result<Vec<TradeListing>, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_fills(fills: &[TradeFill]) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(fills)?)
}

pub fn deserialize_fills(bytes: &[u8]) -> Result<Vec<TradeFill>, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_range_view_json(view: &RangeView) -> Result<String, WireError> {
    Ok(serde_json::to_string(view)?)
}

pub fn deserialize_range_view_json(json: &str) -> Result<RangeView, WireError> {
    Ok(serde_json::from_str(json)?)
}

pub fn serialize_tile_view_json(view: &TileView) -> Result<String, WireError> {
    Ok(serde_json::to_string(view)?)
}

pub fn deserialize_tile_view_json(json: &str) -> Result<TileView, WireError> {
    Ok(serde_json::from_str(json)?)
}

pub fn serialize_alliance_info_json(info: &AllianceInfo) -> Result<String, WireError> {
    Ok(serde_json::to_string(info)?)
}

pub fn deserialize_alliance_info_json(json: &str) -> Result<AllianceInfo, WireError> {
    Ok(serde_json::from_str(json)?)
}

pub fn serialize_listings_json(listings: &[TradeListing]) -> Result<String, WireError> {
    Ok(serde_json::to_string(listings)?)
}

pub fn deserialize_listings_json(json: &str) -> Result<Vec<TradeListing>, WireError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActionFlags, Relation, TileId};

    #[test]
    fn range_view_roundtrip_binary_and_json() {
        let view = RangeView::error(5, 2, 0, 0, "malformed range rectangle");

        let bytes = serialize_range_view(&view).unwrap();
        assert_eq!(deserialize_range_view(&bytes).unwrap(), view);

        let json = serialize_range_view_json(&view).unwrap();
        assert_eq!(deserialize_range_view_json(&json).unwrap(), view);
    }

    #[test]
    fn tile_view_omits_absent_owner() {
        let view = TileView::unowned(TileId(42), "Midlands");
        let json = serialize_tile_view_json(&view).unwrap();
        assert!(!json.contains("owner"));
        assert!(!json.contains("city_name"));

        let back = deserialize_tile_view_json(&json).unwrap();
        assert_eq!(back.actions, ActionFlags::for_relation(Relation::NoRelation));
        assert!(back.owner.is_none());
    }
}

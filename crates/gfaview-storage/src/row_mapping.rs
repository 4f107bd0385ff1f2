use super::*;

pub(super) fn length_from_row(row: &Row) -> rusqlite::Result<(NodeId, u32)> {
    let length: i64 = row.get(1)?;
    Ok((NodeId(row.get(0)?), length.clamp(0, u32::MAX as i64) as u32))
}

pub(super) fn children_from_row(row: &Row) -> Result<(NodeId, Vec<NodeId>), StorageError> {
    let parent = NodeId(row.get(0)?);
    let payload: String = row.get(1)?;
    Ok((parent, deserialize_ids(&payload)?))
}

pub(super) fn serialize_ids(ids: &[NodeId]) -> Result<String, StorageError> {
    let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
    serde_json::to_string(&raw)
        .map_err(|e| StorageError::Other(format!("failed to serialize adjacency list: {e}")))
}

pub(super) fn deserialize_ids(payload: &str) -> Result<Vec<NodeId>, StorageError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Vec<i64> = serde_json::from_str(payload)
        .map_err(|e| StorageError::Other(format!("failed to parse adjacency payload: {e}")))?;
    Ok(parsed.into_iter().map(NodeId).collect())
}

pub(super) fn serialize_genomes(genomes: &[GenomeId]) -> Result<String, StorageError> {
    let raw: Vec<u32> = genomes.iter().map(|genome| genome.0).collect();
    serde_json::to_string(&raw)
        .map_err(|e| StorageError::Other(format!("failed to serialize genome membership: {e}")))
}

pub(super) fn deserialize_genomes(payload: &str) -> Result<Vec<GenomeId>, StorageError> {
    if payload.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Vec<u32> = serde_json::from_str(payload)
        .map_err(|e| StorageError::Other(format!("failed to parse genome membership: {e}")))?;
    Ok(parsed.into_iter().map(GenomeId).collect())
}

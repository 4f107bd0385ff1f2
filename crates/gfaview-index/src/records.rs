//! Line-level reader for the GFA exchange format.

use gfaview_core::NodeId;

pub const GENOME_TAG: &str = "ORI:Z:";
pub const PRE_INDEXED_TAG: &str = "BUILD:Z:VCF2GRAPH";

/// One parsed line, borrowing from the line buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record<'a> {
    /// `H` line listing genome names.
    GenomeHeader(Vec<&'a str>),
    /// `H` line marking a file whose membership fields are raw indices.
    PreIndexedHeader,
    /// Any other `H` line.
    OtherHeader,
    Segment {
        id: NodeId,
        sequence: &'a str,
        /// Raw `ORI:Z:` payload, entries still `;`-separated.
        genomes: Option<&'a str>,
    },
    Link {
        parent: NodeId,
        child: NodeId,
    },
    /// Record kinds the viewer does not use (`P`, `W`, comments, blank lines).
    Skipped,
}

pub fn parse_line(line: &str) -> Result<Record<'_>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.starts_with('#') {
        return Ok(Record::Skipped);
    }

    let mut fields = line.split('\t');
    let kind = fields.next().unwrap_or_default();
    match kind {
        "H" => parse_header(fields.collect()),
        "S" => parse_segment(fields.collect()),
        "L" => parse_link(fields.collect()),
        _ => Ok(Record::Skipped),
    }
}

fn parse_header<'a>(fields: Vec<&'a str>) -> Result<Record<'a>, String> {
    if fields.is_empty() || fields.iter().all(|field| field.is_empty()) {
        return Err("header record has no fields".to_string());
    }
    for field in &fields {
        if let Some(names) = field.strip_prefix(GENOME_TAG) {
            return Ok(Record::GenomeHeader(split_entries(names)));
        }
        if field.starts_with(PRE_INDEXED_TAG) {
            return Ok(Record::PreIndexedHeader);
        }
    }
    Ok(Record::OtherHeader)
}

fn parse_segment<'a>(fields: Vec<&'a str>) -> Result<Record<'a>, String> {
    if fields.len() < 2 {
        return Err(format!(
            "segment record needs an id and a sequence, found {} field(s)",
            fields.len()
        ));
    }
    let id = parse_id(fields[0], "segment id")?;
    let genomes = fields[2..]
        .iter()
        .find_map(|field| field.strip_prefix(GENOME_TAG));
    Ok(Record::Segment {
        id,
        sequence: fields[1],
        genomes,
    })
}

fn parse_link<'a>(fields: Vec<&'a str>) -> Result<Record<'a>, String> {
    if fields.len() < 3 {
        return Err(format!(
            "link record needs parent, orientation and child, found {} field(s)",
            fields.len()
        ));
    }
    Ok(Record::Link {
        parent: parse_id(fields[0], "link parent id")?,
        child: parse_id(fields[2], "link child id")?,
    })
}

fn parse_id(raw: &str, what: &str) -> Result<NodeId, String> {
    let id: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{what} '{raw}' is not numeric"))?;
    if id < 1 {
        return Err(format!("{what} {id} is not positive"));
    }
    Ok(NodeId(id))
}

/// Split a `;`-separated tag payload, dropping empty entries.
pub fn split_entries(payload: &str) -> Vec<&str> {
    payload
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

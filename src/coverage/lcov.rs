use std::collections::BTreeMap;

use log::debug;

/// Branch hit from a `BRDA` line. `hits` is zero when LCOV reports `-` (never taken).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchHit {
    pub line: u32,
    pub block: u32,
    pub branch: u32,
    pub hits: u64,
}

/// Coverage for one `SF:` ... `end_of_record` section of a tracefile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LcovRecord {
    /// Source path exactly as written after `SF:`
    pub path: String,
    /// Line number to hit count, summed across duplicate `DA` lines
    pub lines: BTreeMap<u32, u64>,
    pub branches: Vec<BranchHit>,
}

impl LcovRecord {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn last_line(&self) -> u32 {
        self.lines.keys().next_back().copied().unwrap_or(0)
    }
}

/// Parses an LCOV tracefile.
///
/// Only `SF`, `DA`, `BRDA` and `end_of_record` are interpreted; every other
/// record type (`TN`, `FN`, `LF`, `LH`, ...) and malformed lines are skipped.
/// A section missing its `end_of_record` is still returned.
pub fn parse(contents: &str) -> Vec<LcovRecord> {
    let mut records = Vec::new();
    let mut current: Option<LcovRecord> = None;

    for raw in contents.lines() {
        let line = raw.trim();
        if line == "end_of_record" {
            records.extend(current.take());
            continue;
        }

        let Some((kind, value)) = line.split_once(':') else {
            continue;
        };

        match kind {
            "SF" => {
                records.extend(current.take());
                current = Some(LcovRecord::new(value));
            }
            "DA" => {
                if let (Some(record), Some((line_no, hits))) = (current.as_mut(), parse_da(value)) {
                    *record.lines.entry(line_no).or_insert(0) += hits;
                }
            }
            "BRDA" => {
                if let (Some(record), Some(branch)) = (current.as_mut(), parse_brda(value)) {
                    record.branches.push(branch);
                }
            }
            _ => {}
        }
    }
    records.extend(current);

    debug!("Parsed {} LCOV records", records.len());
    records
}

fn parse_da(value: &str) -> Option<(u32, u64)> {
    let mut fields = value.split(',');
    let line = fields.next()?.trim().parse().ok()?;
    let hits = fields.next()?.trim().parse().ok()?;
    (line > 0).then_some((line, hits))
}

fn parse_brda(value: &str) -> Option<BranchHit> {
    let fields: Vec<&str> = value.split(',').map(str::trim).collect();
    let [line, block, branch, taken] = fields.as_slice() else {
        return None;
    };
    let hits = if *taken == "-" { 0 } else { taken.parse().ok()? };
    Some(BranchHit {
        line: line.parse().ok()?,
        block: block.parse().ok()?,
        branch: branch.parse().ok()?,
        hits,
    })
}

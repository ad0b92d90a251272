use crate::derive::derive_all;
use crate::types::{AcsTable, BlockGroup, Geoid, TigerRecord, TigerTable};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JoinStats {
    pub rows: usize,
    pub matched: usize,
    pub acs_only: usize,
    pub tiger_only: usize,
}

/// Outer-joins demographics and shapes on GEOID, then adds the derived columns.
///
/// Rows come back sorted by GEOID.
pub fn combine_and_derive(acs: AcsTable, tiger: TigerTable) -> (Vec<BlockGroup>, JoinStats) {
    info!(
        acs = acs.rows.len(),
        tiger = tiger.rows.len(),
        "Combining and calculating derivations"
    );

    let mut joined: BTreeMap<Geoid, (Option<Vec<Option<f64>>>, Option<TigerRecord>)> =
        BTreeMap::new();
    for (geoid, values) in acs.rows {
        joined.entry(geoid).or_default().0 = Some(values);
    }
    for (geoid, record) in tiger.rows {
        joined.entry(geoid).or_default().1 = Some(record);
    }

    let mut stats = JoinStats {
        rows: joined.len(),
        ..Default::default()
    };
    for (acs_side, tiger_side) in joined.values() {
        match (acs_side.is_some(), tiger_side.is_some()) {
            (true, true) => stats.matched += 1,
            (true, false) => stats.acs_only += 1,
            (false, true) => stats.tiger_only += 1,
            (false, false) => {}
        }
    }

    if stats.acs_only > 0 {
        warn!(count = stats.acs_only, "Block groups with demographics but no TIGER/Line shape");
    }
    if stats.tiger_only > 0 {
        warn!(count = stats.tiger_only, "Block groups with a TIGER/Line shape but no demographics");
    }

    let rows: Vec<BlockGroup> = joined
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(geoid, (acs, tiger))| {
            let mut bg = BlockGroup {
                geoid,
                acs,
                tiger,
                derived: Vec::new(),
            };
            bg.derived = derive_all(&bg);
            bg
        })
        .collect();

    info!(rows = rows.len(), matched = stats.matched, "Merge done");
    (rows, stats)
}

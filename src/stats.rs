//! Diagnostic statistics: chain-length distribution per generation.

use crate::incr_hash_map::{IncrHashMap, Table};
use core::fmt;

/// Chain lengths at or above the last bin are lumped together.
const HISTOGRAM_BINS: usize = 50;

/// Shape of one bucket-array generation.
pub struct TableStats {
    pub capacity: usize,
    pub used: usize,
    /// Buckets with at least one entry.
    pub nonempty_buckets: usize,
    pub max_chain_len: usize,
    /// `chain_len_histogram[n]` counts buckets whose chain holds `n`
    /// entries; the final bin aggregates everything longer.
    pub chain_len_histogram: [usize; HISTOGRAM_BINS],
}

impl TableStats {
    /// Mean chain length over non-empty buckets.
    pub fn avg_chain_len(&self) -> f64 {
        if self.nonempty_buckets == 0 {
            return 0.0;
        }
        self.used as f64 / self.nonempty_buckets as f64
    }
}

/// Snapshot returned by [`IncrHashMap::stats`]. `tables[1]` is `None`
/// unless a rehash is active.
pub struct Stats {
    pub tables: [Option<TableStats>; 2],
    pub rehashing: bool,
    pub rehash_cursor: Option<usize>,
    pub entries: usize,
}

impl<K, V, S> IncrHashMap<K, V, S> {
    pub fn stats(&self) -> Stats {
        Stats {
            tables: [
                self.table_stats(&self.tables[0]),
                self.table_stats(&self.tables[1]),
            ],
            rehashing: self.is_rehashing(),
            rehash_cursor: self.rehash_cursor,
            entries: self.len(),
        }
    }

    fn table_stats(&self, table: &Table) -> Option<TableStats> {
        if table.capacity() == 0 {
            return None;
        }
        let mut s = TableStats {
            capacity: table.capacity(),
            used: table.used,
            nonempty_buckets: 0,
            max_chain_len: 0,
            chain_len_histogram: [0; HISTOGRAM_BINS],
        };
        for head in &table.buckets {
            let mut len = 0;
            let mut cur = *head;
            while let Some(id) = cur {
                len += 1;
                cur = self.slots[id].next;
            }
            if len > 0 {
                s.nonempty_buckets += 1;
            }
            s.max_chain_len = s.max_chain_len.max(len);
            s.chain_len_histogram[len.min(HISTOGRAM_BINS - 1)] += 1;
        }
        Some(s)
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels = ["main hash table", "rehashing target"];
        for (t, label) in self.tables.iter().zip(labels) {
            let Some(t) = t else { continue };
            writeln!(f, "Hash table stats ({label}):")?;
            writeln!(f, " table size: {}", t.capacity)?;
            writeln!(f, " number of elements: {}", t.used)?;
            if t.used == 0 {
                continue;
            }
            writeln!(f, " different slots: {}", t.nonempty_buckets)?;
            writeln!(f, " max chain length: {}", t.max_chain_len)?;
            writeln!(f, " avg chain length: {:.2}", t.avg_chain_len())?;
            writeln!(f, " Chain length distribution:")?;
            for (len, count) in t.chain_len_histogram.iter().enumerate() {
                if *count == 0 {
                    continue;
                }
                writeln!(
                    f,
                    "   {}{}: {} ({:.2}%)",
                    if len == HISTOGRAM_BINS - 1 { ">=" } else { "" },
                    len,
                    count,
                    *count as f64 / t.capacity as f64 * 100.0
                )?;
            }
        }
        if self.rehashing {
            writeln!(
                f,
                "Rehash in progress: cursor at bucket {}",
                self.rehash_cursor.unwrap_or(0)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::IncrHashMap;

    /// Invariant: histogram totals reconcile with capacity and entry
    /// counts, for one generation or two.
    #[test]
    fn stats_reconcile_with_table_shape() {
        let mut m = IncrHashMap::new();
        for i in 0..100u32 {
            m.insert(i, i).unwrap();
        }
        let st = m.stats();
        assert_eq!(st.entries, 100);
        let mut entries = 0;
        let mut buckets = 0;
        for t in st.tables.iter().flatten() {
            entries += t.used;
            buckets += t.capacity;
            let histogrammed: usize = t
                .chain_len_histogram
                .iter()
                .enumerate()
                .map(|(len, count)| len * count)
                .sum();
            assert_eq!(histogrammed, t.used, "short chains reconcile exactly");
            assert_eq!(t.chain_len_histogram.iter().sum::<usize>(), t.capacity);
        }
        assert_eq!(entries, 100);
        assert_eq!(buckets, m.capacity());
        assert_eq!(st.rehashing, m.is_rehashing());
    }

    /// Invariant: the second generation appears in stats only while a
    /// rehash is active, and the report renders.
    #[test]
    fn second_generation_reported_only_while_rehashing() {
        let mut m = IncrHashMap::new();
        for i in 0..16u32 {
            m.insert(i, i).unwrap();
        }
        while m.is_rehashing() {
            m.rehash_step(10);
        }
        assert!(m.stats().tables[1].is_none());
        let cap = m.capacity();
        m.reserve(cap * 2);
        let st = m.stats();
        assert!(st.rehashing);
        assert!(st.tables[1].is_some());
        let report = st.to_string();
        assert!(report.contains("main hash table"));
        assert!(report.contains("Rehash in progress"));
    }
}

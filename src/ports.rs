//! Expansion of a decode range into the concrete ports it claims.

use std::fmt;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::range::DWORD_DONT_CARE;

/// Size of the x86 I/O port space.
pub const PORT_SPACE: usize = 0x1_0000;

/// Inclusive run of consecutive ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRun {
    pub start: u16,
    pub end: u16,
}

impl PortRun {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub const fn single(port: u16) -> Self {
        Self::new(port, port)
    }

    pub const fn len(self) -> usize {
        self.end as usize - self.start as usize + 1
    }

    pub const fn contains(self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }
}

impl fmt::Display for PortRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}-{:X}", self.start, self.end)
    }
}

/// Ascending, non-adjacent runs covering every port a range decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortRuns(Vec<PortRun>);

impl PortRuns {
    pub fn runs(&self) -> &[PortRun] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PortRun> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of ports covered.
    pub fn len_ports(&self) -> usize {
        self.0.iter().map(|r| r.len()).sum()
    }

    pub fn contains(&self, port: u16) -> bool {
        let idx = self.0.partition_point(|r| r.end < port);
        self.0.get(idx).is_some_and(|r| r.contains(port))
    }

    /// One bit per port in the 64K I/O space.
    pub fn coverage(&self) -> BitVec {
        let mut bits = BitVec::repeat(false, PORT_SPACE);
        for r in &self.0 {
            bits[r.start as usize..r.end as usize + 1].fill(true);
        }
        bits
    }

    pub fn overlaps(&self, other: &PortRuns) -> bool {
        let bits = self.coverage();
        other
            .iter()
            .any(|r| bits[r.start as usize..r.end as usize + 1].any())
    }
}

impl<'a> IntoIterator for &'a PortRuns {
    type Item = &'a PortRun;
    type IntoIter = std::slice::Iter<'a, PortRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for PortRuns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{r}")?;
        }
        Ok(())
    }
}

/// Walks the whole port space and coalesces every port `p` with
/// `p | m == base | m` (where `m` is `mask` plus the DWORD bits) into runs.
pub fn expand(base: u32, mask: u32) -> PortRuns {
    let mask = mask | DWORD_DONT_CARE;
    let want = base | mask;

    let mut runs = Vec::new();
    let mut open: Option<PortRun> = None;
    for p in 0..=u16::MAX {
        if u32::from(p) | mask != want {
            continue;
        }
        open = match open {
            Some(mut run) if u32::from(run.end) + 1 == u32::from(p) => {
                run.end = p;
                Some(run)
            }
            Some(run) => {
                runs.push(run);
                Some(PortRun::single(p))
            }
            None => Some(PortRun::single(p)),
        };
    }
    runs.extend(open);
    PortRuns(runs)
}

use std::collections::HashSet;

use crate::error::{ErrorCode, TiffError, TiffResult};

/// The directories read so far, by absolute position.
///
/// A well formed structure is a tree: every directory is reached exactly once, through the
/// header, a next pointer or a sub-directory entry. Reaching a position a second time means the
/// offsets form a cycle, or at least a shared directory, and both are rejected so that decoding
/// terminates on hostile input.
#[derive(Debug)]
pub struct VisitedDirectories {
    offsets: HashSet<usize>,
    max: usize,
}

impl VisitedDirectories {
    pub fn new(max: usize) -> Self {
        VisitedDirectories {
            offsets: HashSet::new(),
            max,
        }
    }

    /// Record a visit to the directory at `offset`.
    pub fn visit(&mut self, offset: usize) -> TiffResult<()> {
        if self.offsets.contains(&offset) {
            return Err(TiffError::new(ErrorCode::CycleInOffsets).arg(offset));
        }
        if self.offsets.len() >= self.max {
            return Err(TiffError::new(ErrorCode::LimitsExceeded)
                .arg(format_args!("more than {} directories", self.max)));
        }
        self.offsets.insert(offset);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }
}

#[test]
fn cycles_are_detected() {
    let mut visited = VisitedDirectories::new(16);

    visited.visit(0x20).expect("first visit is valid");
    visited.visit(0x800).expect("first visit is valid");

    let err = visited.visit(0x20).expect_err("cycle must be detected");
    assert_eq!(err.code(), ErrorCode::CycleInOffsets);
    assert_eq!(err.args(), ["32"]);
}

#[test]
fn directory_limit() {
    let mut visited = VisitedDirectories::new(2);

    visited.visit(8).expect("within limit");
    visited.visit(100).expect("within limit");

    let err = visited.visit(200).expect_err("limit must be enforced");
    assert_eq!(err.code(), ErrorCode::LimitsExceeded);
    assert_eq!(visited.len(), 2);
}

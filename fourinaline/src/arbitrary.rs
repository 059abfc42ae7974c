use quickcheck::{Arbitrary, Gen};

use crate::DEFAULT_COLS;

/// A list of column choices, some of which may turn out to be illegal when played.
///
/// Columns are drawn from one past the last column too, so that out-of-range
/// moves show up as well.
#[derive(Clone, Debug)]
pub struct MoveSequence(pub Vec<usize>);

impl Arbitrary for MoveSequence {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 60;
        let columns = (0..len)
            .map(|_| usize::arbitrary(g) % (DEFAULT_COLS + 1))
            .collect();
        MoveSequence(columns)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(MoveSequence))
    }
}

/// Receives progress ticks from a long computation.
///
/// `step` grows by one per tick and reaches `total` on the last one.
pub trait Progress {
    fn tick(&mut self, step: usize, total: usize);
}

impl<F> Progress for F
where
    F: FnMut(usize, usize),
{
    fn tick(&mut self, step: usize, total: usize) {
        self(step, total)
    }
}

/// Discards every tick.
pub struct Silent;

impl Progress for Silent {
    fn tick(&mut self, _step: usize, _total: usize) {}
}

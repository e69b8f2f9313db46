// Align: put every node on one clock.
// origin picks the shared t=0; window clips and rebases each series to it.

pub mod origin;
pub mod window;

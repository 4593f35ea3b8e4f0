//! Request façades: the two entry shapes callers use to open an approval
//! round and consume its outcome — a caller blocked on its own HTTP
//! handler, or an external discharge authority polling independently.

pub mod polled;
pub mod sync;

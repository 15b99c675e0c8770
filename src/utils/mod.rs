pub mod clock;
pub mod locker;
pub mod mask;

pub use clock::{Clock, SystemClock};

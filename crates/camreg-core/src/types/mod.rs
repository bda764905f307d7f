mod board;
mod observation;
mod pose;

pub use board::*;
pub use observation::*;
pub use pose::*;

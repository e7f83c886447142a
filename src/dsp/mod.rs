//! Software audio, used when the tone has to be produced without a
//! browser audio stack.

pub mod offline;
pub mod oscillator;

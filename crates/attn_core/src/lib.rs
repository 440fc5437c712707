pub mod input;
pub mod time;
pub mod timer;

pub use input::{InputIntent, InputState, Key};
pub use time::TimeState;
pub use timer::EffectTimer;

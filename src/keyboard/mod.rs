pub mod handlers;
pub mod keysyms;

pub use handlers::{Arg, ButtonBinding, Click, KeyAction, KeyBinding, KeyboardMapping};

//! User interface: output rendering and input handling.
//!
//! - **renderer**: styled-run renderer for the scrolling output stream
//! - **input**: stdin line reader feeding the command channel

pub mod input;
pub mod renderer;

pub use input::InputReader;
pub use renderer::StreamRenderer;

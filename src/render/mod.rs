pub mod buffer;
pub mod overlay;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use buffer::{PixelBuffer, TRANSPARENT};
pub use overlay::{NullOverlay, Overlay};
pub use skeleton::SKELETON_CONNECTIONS;
#[cfg(feature = "desktop")]
pub use window::MinifbOverlay;

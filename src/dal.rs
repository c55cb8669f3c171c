pub mod route_layers;
pub mod sessions;
pub mod stops;

pub use route_layers::*;
pub use sessions::*;
pub use stops::*;

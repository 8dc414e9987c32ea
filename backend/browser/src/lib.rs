pub mod screenshot;
pub mod simulated;

pub use screenshot::{decode_data_url, encode_data_url, placeholder_image};
pub use simulated::SimulatedBrowser;

pub mod qr;
pub mod secret;
pub mod validation;

pub use qr::{ImageRenderer, PngQrRenderer};
pub use secret::generate_secret;
pub use validation::ValidatedJson;

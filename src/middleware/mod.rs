mod guards;
mod json_error;
mod panic;
mod session_gate;

pub use guards::SessionUser;
pub use json_error::json_error_middleware;
pub use panic::catch_panic_layer;
pub use session_gate::{is_public_path, session_gate};

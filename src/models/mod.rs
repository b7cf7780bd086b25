pub mod profile;
pub mod state;

pub use profile::*;
pub use state::*;

pub mod discord;
pub mod util;

mod caption;
mod plan;
mod render;
mod resolve;
mod sweep;

pub use caption::cmd_caption;
pub use plan::cmd_plan;
pub use render::cmd_render;
pub use resolve::cmd_resolve;
pub use sweep::cmd_sweep;

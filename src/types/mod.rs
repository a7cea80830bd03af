pub mod bar;
pub mod batch;
pub mod indicator;
pub mod instrument;
pub mod signals;
pub mod update_log;

pub use bar::*;
pub use batch::*;
pub use indicator::*;
pub use instrument::*;
pub use signals::*;
pub use update_log::*;

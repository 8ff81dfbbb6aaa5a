// HTTP routes
pub mod batch;
pub mod extract;
pub mod health;
pub mod queue;
pub mod stream;

pub use batch::*;
pub use extract::*;
pub use health::*;
pub use queue::*;
pub use stream::*;

pub mod clock;
pub mod ids;
pub mod locks;
pub mod telemetry;

pub use clock::*;
pub use ids::*;
pub use locks::EntityLocks;
pub use telemetry::*;

pub mod core;
pub use self::core::*;

pub mod goals;
pub use self::goals::*;

pub mod reviews;
pub use self::reviews::*;

pub mod attendance;
pub use self::attendance::*;

pub mod assets;
pub use self::assets::*;

pub mod notifications;
pub use self::notifications::*;

pub mod audit;
pub use self::audit::*;

pub mod booking;
pub mod commission;
pub mod coupon;
pub mod events;
pub mod invoice;
pub mod money;
pub mod qualification;

pub use booking::*;
pub use commission::*;
pub use coupon::*;
pub use events::*;
pub use invoice::*;
pub use money::*;
pub use qualification::*;

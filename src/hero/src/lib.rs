//! Player-side state: inventory, position and health.

pub mod inventory;
pub mod player;
pub mod vitals;

pub use inventory::{Inventory, InventoryError};
pub use player::{Facing, PlayerState};
pub use vitals::PlayerVitals;

pub const DEFAULT_INVENTORY_CAPACITY: usize = 12;
pub const DEFAULT_MAX_HEALTH: u32 = 6;
/// Pixels per second
pub const DEFAULT_PLAYER_SPEED: f32 = 120.0;
pub const DEFAULT_PLAYER_SIZE: f32 = 20.0;

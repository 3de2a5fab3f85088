pub mod grn_draft;
pub mod grn_draft_line;
pub mod inventory_movement;
pub mod inventory_on_hand;
pub mod product;

pub use grn_draft::{Entity as GrnDraft, GrnStatus};
pub use grn_draft_line::Entity as GrnDraftLine;
pub use inventory_movement::{Entity as InventoryMovement, MovementType};
pub use inventory_on_hand::Entity as InventoryOnHand;
pub use product::Entity as Product;

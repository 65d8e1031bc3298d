//! Aggregates module
pub mod product;
pub mod order;
pub mod user;
pub mod admin;
pub mod category;

pub use product::{Product, ProductDraft, ProductError, ProductStatus, Variant, Rating, FlashSale};
pub use order::{Order, OrderError, OrderStatus, OrderItem, PaymentStatus, Address};
pub use user::{User, UserRole, AccountStatus, AccountUpdate, ShippingAddress, StoreDetails, ProfileUpdate};
pub use admin::{Admin, AdminRole, Permission, LoginRecord};
pub use category::{Category, CategoryDraft, CategoryError, CategoryStatus};

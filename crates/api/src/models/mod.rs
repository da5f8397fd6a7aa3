//! Domain models for the API.
//!
//! These types represent validated domain objects separate from wire-level
//! request/response types (which live next to their route handlers).

pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem};
pub use category::{Category, Subcategory};
pub use order::{Order, OrderAmounts, OrderItem, ShippingAddress};
pub use product::{HomeSection, Product, ProductImage, ProductSummary, ProductVariant, StockPool};
pub use session::{CurrentUser, session_keys};
pub use user::{Address, NewAddress, User};

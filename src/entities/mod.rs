//! sea-orm entities. Table names are plural; JSON columns hold ordered
//! arrays whose order is carried by a `rank` field.

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod cms_page;
pub mod collection;
pub mod collection_product;
pub mod daily_material_rate;
pub mod market;
pub mod material_rate;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_pricing;
pub mod product_slug_redirect;
pub mod promotion;
pub mod session;
pub mod user;
pub mod wishlist_item;

pub use product::{Gender, Material};

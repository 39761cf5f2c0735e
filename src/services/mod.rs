//! Domain services. Each service owns its queries and transactions and
//! reports failures as [`crate::errors::ServiceError`].

pub mod cart;
pub mod catalog_filter;
pub mod categories;
pub mod checkout;
pub mod cms;
pub mod collections;
pub mod markets;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod promotions;
pub mod slug;
pub mod storage;
pub mod wishlist;

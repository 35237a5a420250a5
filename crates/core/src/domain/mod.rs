pub mod customer;
pub mod delivery;
pub mod order;
pub mod product;

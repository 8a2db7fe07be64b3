pub mod audit_logs;
pub mod group_listing_members;
pub mod group_listings;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use group_listing_members::Entity as GroupListingMembers;
pub use group_listings::Entity as GroupListings;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use users::Entity as Users;

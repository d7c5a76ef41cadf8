//! sea-orm models for the CRM tables.

pub mod company;
pub mod contact;
pub mod deal;

pub mod prelude {
    pub use crate::company::Entity as Company;
    pub use crate::contact::Entity as Contact;
    pub use crate::deal::Entity as Deal;
}

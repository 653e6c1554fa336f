pub mod links;
pub mod profile;
pub mod record;

pub use links::{LinkType, Links, company_uri};
pub use profile::{CompanyProfile, ProfileDelta, RegisteredOfficeAddress};
pub use record::{CompanyRecord, Updated};

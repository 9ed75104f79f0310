pub mod appointment;
pub mod customer;
pub mod financial_transaction;
pub mod hospitalization;
pub mod medical_record;
pub mod onboarding_progress;
pub mod pet;
pub mod product;
pub mod sale;
pub mod sale_item;
pub mod support_ticket;
pub mod tenant;
pub mod tenant_member;
pub mod transport_route;
pub mod transport_stop;
pub mod user;

pub use appointment::Entity as Appointment;
pub use customer::Entity as Customer;
pub use financial_transaction::Entity as FinancialTransaction;
pub use hospitalization::Entity as Hospitalization;
pub use medical_record::Entity as MedicalRecord;
pub use onboarding_progress::Entity as OnboardingProgress;
pub use pet::Entity as Pet;
pub use product::Entity as Product;
pub use sale::Entity as Sale;
pub use sale_item::Entity as SaleItem;
pub use support_ticket::Entity as SupportTicket;
pub use tenant::Entity as Tenant;
pub use tenant_member::Entity as TenantMember;
pub use transport_route::Entity as TransportRoute;
pub use transport_stop::Entity as TransportStop;
pub use user::Entity as User;

use sea_orm::EntityTrait;

/// Entities whose rows belong to exactly one tenant.
pub trait TenantScoped: EntityTrait {
    fn tenant_column() -> Self::Column;
    fn id_column() -> Self::Column;
}

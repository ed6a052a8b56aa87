pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::models::{Credentials, DateRange, NewPatient, NewPayment, Patient, Payment, User};

pub use http::HttpGateway;
pub use memory::InMemoryGateway;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Remote operations of the payments service.
///
/// Every call hits the service once: no retries and no caching.
#[async_trait]
pub trait PaymentsApi: Send + Sync {
    /// Authenticate an admin and open a session
    async fn login(&self, credentials: &Credentials) -> ApiResult<User>;

    /// Invalidate the server-side session
    async fn logout(&self) -> ApiResult<()>;

    /// Substring search on patient names. Callers must not send an empty query.
    async fn search_patients(&self, query: &str) -> ApiResult<Vec<Patient>>;

    /// Payments within the given bounds, in the order the service returns them
    async fn list_payments(&self, range: &DateRange) -> ApiResult<Vec<Payment>>;

    async fn create_patient(&self, patient: &NewPatient) -> ApiResult<Patient>;

    async fn create_payment(&self, payment: &NewPayment) -> ApiResult<Payment>;
}

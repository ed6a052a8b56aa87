use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{ApiResult, PaymentsApi};
use crate::error::ApiError;
use crate::models::{Credentials, DateRange, NewPatient, NewPayment, Patient, Payment, User};

/// In-process implementation of `PaymentsApi`.
///
/// Behaves like the real service (substring search, inclusive date bounds, newest
/// payments first) and records every call so tests can assert on network traffic.
#[derive(Default)]
pub struct InMemoryGateway {
    store: Mutex<Store>,
}

#[derive(Default)]
struct Store {
    patients: Vec<Patient>,
    payments: Vec<Payment>,
    admins: Vec<(Credentials, User)>,
    session: Option<User>,
    searches: Vec<String>,
    listings: Vec<DateRange>,
    created_patients: usize,
    created_payments: usize,
    list_delays: VecDeque<Duration>,
    search_delay: Option<Duration>,
    failure: Option<String>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_admin(self, username: &str, password: &str, name: &str) -> Self {
        {
            let mut store = self.store();
            let id = store.admins.len() as i64 + 1;
            store.admins.push((
                Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                },
                User {
                    id,
                    name: name.to_string(),
                    username: username.to_string(),
                },
            ));
        }
        self
    }

    pub fn seed_patient(&self, name: &str) -> Patient {
        let mut store = self.store();
        let patient = Patient {
            id: store.patients.len() as i64 + 1,
            name: name.to_string(),
        };
        store.patients.push(patient.clone());
        patient
    }

    pub fn seed_payment(&self, patient: &Patient, amount: f64, paid_at: NaiveDate) -> Payment {
        let mut store = self.store();
        let payment = Payment {
            id: store.payments.len() as i64 + 1,
            patient_id: patient.id,
            patient_name: patient.name.clone(),
            amount,
            paid_at,
            created_by: store.session.as_ref().map(|user| user.id).unwrap_or(1),
            created_at: Utc::now(),
        };
        store.payments.push(payment.clone());
        payment
    }

    /// Queries received by `search_patients`, oldest first
    pub fn searches(&self) -> Vec<String> {
        self.store().searches.clone()
    }

    /// Ranges received by `list_payments`, oldest first
    pub fn listings(&self) -> Vec<DateRange> {
        self.store().listings.clone()
    }

    pub fn created_patients(&self) -> usize {
        self.store().created_patients
    }

    pub fn created_payments(&self) -> usize {
        self.store().created_payments
    }

    pub fn session(&self) -> Option<User> {
        self.store().session.clone()
    }

    /// Delay the next `list_payments` call. Queued delays apply in call order.
    pub fn delay_next_listing(&self, delay: Duration) {
        self.store().list_delays.push_back(delay);
    }

    pub fn set_search_delay(&self, delay: Option<Duration>) {
        self.store().search_delay = delay;
    }

    /// Make every call fail with a 500 carrying `message` until cleared with `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        self.store().failure = message.map(str::to_string);
    }

    fn check_failure(&self) -> ApiResult<()> {
        match &self.store().failure {
            Some(message) => Err(ApiError::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn require_session(&self) -> ApiResult<User> {
        self.store().session.clone().ok_or(ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            message: "Authentication required".to_string(),
        })
    }
}

#[async_trait]
impl PaymentsApi for InMemoryGateway {
    async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        self.check_failure()?;
        let mut store = self.store();
        let user = store
            .admins
            .iter()
            .find(|(known, _)| {
                known.username == credentials.username && known.password == credentials.password
            })
            .map(|(_, user)| user.clone())
            .ok_or(ApiError::Status {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid username or password".to_string(),
            })?;

        store.session = Some(user.clone());
        Ok(user)
    }

    async fn logout(&self) -> ApiResult<()> {
        self.check_failure()?;
        self.store().session = None;
        Ok(())
    }

    async fn search_patients(&self, query: &str) -> ApiResult<Vec<Patient>> {
        let delay = {
            let mut store = self.store();
            store.searches.push(query.to_string());
            store.search_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;

        let needle = query.to_lowercase();
        Ok(self
            .store()
            .patients
            .iter()
            .filter(|patient| patient.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn list_payments(&self, range: &DateRange) -> ApiResult<Vec<Payment>> {
        let delay = {
            let mut store = self.store();
            store.listings.push(*range);
            store.list_delays.pop_front()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;

        let mut payments: Vec<Payment> = self
            .store()
            .payments
            .iter()
            .filter(|payment| range.contains(payment.paid_at))
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at).then(b.id.cmp(&a.id)));
        Ok(payments)
    }

    async fn create_patient(&self, patient: &NewPatient) -> ApiResult<Patient> {
        self.check_failure()?;
        self.require_session()?;

        let created = self.seed_patient(&patient.name);
        self.store().created_patients += 1;
        Ok(created)
    }

    async fn create_payment(&self, payment: &NewPayment) -> ApiResult<Payment> {
        self.check_failure()?;
        self.require_session()?;

        let patient = self
            .store()
            .patients
            .iter()
            .find(|patient| patient.id == payment.patient_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: "Patient not found".to_string(),
            })?;

        let created = self.seed_payment(&patient, payment.amount, payment.paid_at);
        self.store().created_payments += 1;
        Ok(created)
    }
}

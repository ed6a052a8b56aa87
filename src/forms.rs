//! Admin forms for registering patients and recording payments.
//!
//! Both forms validate locally before touching the network, report the outcome through
//! a `FormStatus`, and bump `DataChanges` after a successful create so listings refetch.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::autocomplete::PatientAutocomplete;
use crate::config::Timings;
use crate::error::SubmitError;
use crate::gateway::PaymentsApi;
use crate::models::{Patient, Payment};
use crate::payments_list::DataChanges;
use crate::timer::TaskSlot;
use crate::validation::{self, DATE_FORMAT};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormStatus {
    pub submitting: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Status shared by both forms, including the auto-clearing success notice
struct Feedback {
    state: Arc<watch::Sender<FormStatus>>,
    clear_success: TaskSlot,
    notice_ttl: Duration,
}

impl Feedback {
    fn new(notice_ttl: Duration) -> Self {
        let (state, _) = watch::channel(FormStatus::default());
        Self {
            state: Arc::new(state),
            clear_success: TaskSlot::new(),
            notice_ttl,
        }
    }

    /// Enter the submitting state. False if a submission is already running.
    fn begin(&self) -> bool {
        let started = self.state.send_if_modified(|status| {
            if status.submitting {
                return false;
            }
            status.submitting = true;
            status.error = None;
            status.success = None;
            true
        });
        if started {
            self.clear_success.cancel();
        }
        started
    }

    /// Local validation failure; no request was made
    fn reject(&self, message: String) {
        self.state.send_modify(|status| status.error = Some(message));
    }

    fn fail(&self, message: String) {
        self.state.send_modify(|status| {
            status.submitting = false;
            status.error = Some(message);
        });
    }

    fn succeed(&self, message: String) {
        self.state.send_modify(|status| {
            status.submitting = false;
            status.success = Some(message);
        });

        // Rescheduling replaces the previous timer, so an older notice's timer never
        // clears a newer one
        let state = self.state.clone();
        let ttl = self.notice_ttl;
        self.clear_success.schedule(async move {
            tokio::time::sleep(ttl).await;
            state.send_modify(|status| status.success = None);
        });
    }

    fn dismiss_error(&self) {
        self.state.send_if_modified(|status| status.error.take().is_some());
    }
}

pub struct PatientForm {
    api: Arc<dyn PaymentsApi>,
    changes: DataChanges,
    feedback: Feedback,
}

impl PatientForm {
    pub fn new(api: Arc<dyn PaymentsApi>, changes: DataChanges, timings: Timings) -> Self {
        Self {
            api,
            changes,
            feedback: Feedback::new(timings.notice_ttl),
        }
    }

    pub fn status(&self) -> FormStatus {
        self.feedback.state.borrow().clone()
    }

    pub fn dismiss_error(&self) {
        self.feedback.dismiss_error();
    }

    pub async fn submit(&self, name: &str) -> Result<Patient, SubmitError> {
        let new_patient = validation::validate_patient_name(name).map_err(|err| {
            self.feedback.reject(err.to_string());
            err
        })?;

        if !self.feedback.begin() {
            return Err(SubmitError::Busy);
        }

        match self.api.create_patient(&new_patient).await {
            Ok(patient) => {
                tracing::info!("created patient {} ({})", patient.id, patient.name);
                self.feedback
                    .succeed(format!("Patient \"{}\" added successfully!", new_patient.name));
                self.changes.bump();
                Ok(patient)
            }
            Err(err) => {
                self.feedback.fail(err.to_string());
                Err(err.into())
            }
        }
    }
}

/// Editable fields of the payment form
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentFields {
    pub patient: Option<Patient>,
    pub amount: String,
    pub paid_at: String,
}

impl PaymentFields {
    fn blank() -> Self {
        Self {
            patient: None,
            amount: String::new(),
            paid_at: today(),
        }
    }
}

fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Payment form with its embedded patient search box.
pub struct PaymentForm {
    api: Arc<dyn PaymentsApi>,
    changes: DataChanges,
    feedback: Feedback,
    autocomplete: PatientAutocomplete,
    selections: Mutex<mpsc::UnboundedReceiver<Patient>>,
    fields: Mutex<PaymentFields>,
}

impl PaymentForm {
    pub fn new(api: Arc<dyn PaymentsApi>, changes: DataChanges, timings: Timings) -> Self {
        let (autocomplete, selections) = PatientAutocomplete::new(api.clone(), timings);
        Self {
            api,
            changes,
            feedback: Feedback::new(timings.notice_ttl),
            autocomplete,
            selections: Mutex::new(selections),
            fields: Mutex::new(PaymentFields::blank()),
        }
    }

    pub fn autocomplete(&self) -> &PatientAutocomplete {
        &self.autocomplete
    }

    pub fn status(&self) -> FormStatus {
        self.feedback.state.borrow().clone()
    }

    pub fn dismiss_error(&self) {
        self.feedback.dismiss_error();
    }

    fn lock_fields(&self) -> MutexGuard<'_, PaymentFields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current field values, after taking in any selection made in the search box
    pub fn fields(&self) -> PaymentFields {
        let mut selections = self
            .selections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut fields = self.lock_fields();
        while let Ok(patient) = selections.try_recv() {
            fields.patient = Some(patient);
        }
        fields.clone()
    }

    pub fn set_amount(&self, amount: &str) {
        self.lock_fields().amount = amount.to_string();
    }

    pub fn set_paid_at(&self, paid_at: &str) {
        self.lock_fields().paid_at = paid_at.to_string();
    }

    pub async fn submit(&self) -> Result<Payment, SubmitError> {
        let fields = self.fields();
        let new_payment =
            validation::validate_payment(fields.patient.as_ref(), &fields.amount, &fields.paid_at)
                .map_err(|err| {
                    self.feedback.reject(err.to_string());
                    err
                })?;

        if !self.feedback.begin() {
            return Err(SubmitError::Busy);
        }

        match self.api.create_payment(&new_payment).await {
            Ok(payment) => {
                tracing::info!(
                    "recorded payment {} of {} for patient {}",
                    payment.id,
                    payment.amount,
                    payment.patient_id
                );
                self.feedback
                    .succeed("Payment added successfully!".to_string());
                *self.lock_fields() = PaymentFields::blank();
                self.autocomplete.reset();
                self.changes.bump();
                Ok(payment)
            }
            Err(err) => {
                self.feedback.fail(err.to_string());
                Err(err.into())
            }
        }
    }
}

//! Client for a patient payments ledger service.
//!
//! The two stateful pieces are [`autocomplete::PatientAutocomplete`], a debounced
//! patient search box, and [`payments_list::PaymentsList`], a date-filtered listing that
//! only ever shows the response to its most recent request. Both talk to the service
//! through [`gateway::PaymentsApi`].

pub mod autocomplete;
pub mod cli;
pub mod config;
pub mod error;
pub mod forms;
pub mod gateway;
pub mod models;
pub mod payments_list;
pub mod render;
pub mod session;
pub mod timer;
pub mod validation;

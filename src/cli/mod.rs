pub mod dashboard;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

use crate::config::Config;
use crate::gateway::{HttpGateway, PaymentsApi};
use crate::models::{Credentials, DateRange};
use crate::payments_list::{ListStatus, PaymentsList};
use crate::render;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(name = "patient-ledger")]
#[command(about = "Patient payments ledger client")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the public payments ledger
    Payments {
        /// Earliest payment date to include (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Latest payment date to include (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },

    /// Search patients by name
    Patients {
        query: String,

        #[command(flatten)]
        login: LoginArgs,
    },

    /// Interactive admin dashboard
    Dashboard {
        #[command(flatten)]
        login: LoginArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Admin username
    #[arg(long, env = "PAYMENTS_USERNAME")]
    pub username: String,

    /// Admin password
    #[arg(long, env = "PAYMENTS_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl LoginArgs {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let api: Arc<dyn PaymentsApi> = Arc::new(HttpGateway::new(
        &cli.config.api_url,
        cli.config.request_timeout(),
    )?);
    tracing::debug!("using payments service at {}", cli.config.api_url);

    match cli.command {
        Command::Payments {
            start_date,
            end_date,
        } => show_payments(api, DateRange::new(start_date, end_date)).await,
        Command::Patients { query, login } => search_patients(api, &query, &login).await,
        Command::Dashboard { login } => {
            dashboard::run(api, &login, cli.config.timings()).await
        }
    }
}

async fn show_payments(api: Arc<dyn PaymentsApi>, range: DateRange) -> Result<()> {
    let list = PaymentsList::new(api);
    list.apply_filter(range).await;

    let state = list.state();
    print!("{}", render::list_view(state.view()));
    match state.status {
        ListStatus::Error(message) => Err(anyhow!(message)),
        _ => Ok(()),
    }
}

async fn search_patients(api: Arc<dyn PaymentsApi>, query: &str, login: &LoginArgs) -> Result<()> {
    if query.trim().is_empty() {
        return Err(anyhow!("search query must not be empty"));
    }

    let session = Session::new();
    session.login(api.as_ref(), &login.credentials()).await?;

    let result = api.search_patients(query).await;
    session.logout(api.as_ref()).await;

    let patients = result?;
    if patients.is_empty() {
        println!("No patients match {:?}.", query);
    }
    for patient in patients {
        println!("{:>6}  {}", patient.id, patient.name);
    }
    Ok(())
}

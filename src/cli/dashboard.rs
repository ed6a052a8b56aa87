//! Line-oriented admin dashboard: the add-patient form, the add-payment form with its
//! patient search box, and the filtered payments list, driven from stdin.

use anyhow::Result;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::LoginArgs;
use crate::config::Timings;
use crate::error::SubmitError;
use crate::forms::{FormStatus, PatientForm, PaymentForm};
use crate::gateway::PaymentsApi;
use crate::models::{DateRange, Patient};
use crate::payments_list::{DataChanges, PaymentsList};
use crate::render;
use crate::session::Session;
use crate::timer::TaskSlot;
use crate::validation::parse_optional_date;

const HELP: &str = "\
commands:
  type <text>            type into the patient search box
  pick <n>               choose suggestion n
  focus | blur           focus or leave the search box
  amount <x>             set the payment amount
  date <YYYY-MM-DD>      set the payment date
  pay                    save the payment
  patient <name>         register a new patient
  filter [start] [end]   filter payments by date, '-' leaves a bound open
  reset                  clear the date filter
  show                   show the payment form and the payments list
  dismiss                dismiss error messages
  help                   this text
  quit                   sign out and exit
";

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    Type(String),
    Pick(usize),
    Focus,
    Blur,
    Amount(String),
    Date(String),
    Pay,
    Patient(String),
    Filter(DateRange),
    Reset,
    Show,
    Dismiss,
    Help,
    Quit,
}

impl FromStr for DashboardCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word {
            "type" => DashboardCommand::Type(rest.to_string()),
            "pick" => {
                let n: usize = rest
                    .parse()
                    .map_err(|_| format!("not a suggestion number: {:?}", rest))?;
                if n == 0 {
                    return Err("suggestions are numbered from 1".to_string());
                }
                DashboardCommand::Pick(n - 1)
            }
            "focus" => DashboardCommand::Focus,
            "blur" => DashboardCommand::Blur,
            "amount" => DashboardCommand::Amount(rest.to_string()),
            "date" => DashboardCommand::Date(rest.to_string()),
            "pay" => DashboardCommand::Pay,
            "patient" => DashboardCommand::Patient(rest.to_string()),
            "filter" => {
                let mut bounds = rest.split_whitespace().map(|bound| match bound {
                    "-" => Ok(None),
                    bound => parse_optional_date(bound),
                });
                let start = bounds.next().transpose().map_err(|e| e.to_string())?;
                let end = bounds.next().transpose().map_err(|e| e.to_string())?;
                if bounds.next().is_some() {
                    return Err("filter takes at most two dates".to_string());
                }
                DashboardCommand::Filter(DateRange::new(start.flatten(), end.flatten()))
            }
            "reset" => DashboardCommand::Reset,
            "show" => DashboardCommand::Show,
            "dismiss" => DashboardCommand::Dismiss,
            "help" | "?" => DashboardCommand::Help,
            "quit" | "exit" => DashboardCommand::Quit,
            other => return Err(format!("unknown command {:?}, try 'help'", other)),
        };
        Ok(command)
    }
}

pub struct Dashboard {
    list: PaymentsList,
    patient_form: PatientForm,
    payment_form: PaymentForm,
}

impl Dashboard {
    pub fn new(api: Arc<dyn PaymentsApi>, timings: Timings) -> Self {
        let changes = DataChanges::new();
        let list = PaymentsList::new(api.clone());
        list.follow(&changes);

        Self {
            list,
            patient_form: PatientForm::new(api.clone(), changes.clone(), timings),
            payment_form: PaymentForm::new(api, changes, timings),
        }
    }

    pub fn list(&self) -> &PaymentsList {
        &self.list
    }

    pub fn payment_form(&self) -> &PaymentForm {
        &self.payment_form
    }

    pub async fn start(&self) -> String {
        self.list.mount().await;
        self.render_list()
    }

    fn render_list(&self) -> String {
        render::list_view(self.list.state().view())
    }

    fn render_payment_form(&self) -> String {
        let fields = self.payment_form.fields();
        let query = self.payment_form.autocomplete().state().query;
        format!(
            "patient: {}\nsearch:  {}\namount:  {}\ndate:    {}\n",
            fields
                .patient
                .map(|patient| patient.name)
                .unwrap_or_else(|| "(none)".to_string()),
            query,
            fields.amount,
            fields.paid_at,
        )
    }

    /// Run one command; `None` once the user asked to quit.
    pub async fn handle(&self, command: DashboardCommand) -> Option<String> {
        let autocomplete = self.payment_form.autocomplete();

        let output = match command {
            DashboardCommand::Type(text) => {
                autocomplete.input(&text);
                String::new()
            }
            DashboardCommand::Pick(index) => match autocomplete.select_index(index) {
                Some(patient) => format!("selected {}\n", patient.name),
                None => format!("no suggestion [{}]\n", index + 1),
            },
            DashboardCommand::Focus => {
                autocomplete.focus();
                String::new()
            }
            DashboardCommand::Blur => {
                autocomplete.blur();
                String::new()
            }
            DashboardCommand::Amount(amount) => {
                self.payment_form.set_amount(&amount);
                String::new()
            }
            DashboardCommand::Date(date) => {
                self.payment_form.set_paid_at(&date);
                String::new()
            }
            DashboardCommand::Pay => {
                let result = self.payment_form.submit().await.map(|_| ());
                outcome(result, self.payment_form.status())
            }
            DashboardCommand::Patient(name) => {
                let result = self.patient_form.submit(&name).await.map(|_| ());
                outcome(result, self.patient_form.status())
            }
            DashboardCommand::Filter(range) => {
                self.list.apply_filter(range).await;
                self.render_list()
            }
            DashboardCommand::Reset => {
                self.list.reset_filter().await;
                self.render_list()
            }
            DashboardCommand::Show => {
                format!("{}\n{}", self.render_payment_form(), self.render_list())
            }
            DashboardCommand::Dismiss => {
                self.patient_form.dismiss_error();
                self.payment_form.dismiss_error();
                String::new()
            }
            DashboardCommand::Help => HELP.to_string(),
            DashboardCommand::Quit => return None,
        };
        Some(output)
    }
}

fn outcome(result: Result<(), SubmitError>, status: FormStatus) -> String {
    match result {
        Ok(()) => format!("{}\n", status.success.unwrap_or_default()),
        Err(err) => format!("error: {}\n", err),
    }
}

/// Tracks the suggestion list last printed, so a listing is echoed only when it changes.
#[derive(Debug, Default)]
struct SuggestionEcho {
    shown: Vec<Patient>,
}

impl SuggestionEcho {
    fn update(&mut self, visible: &[Patient]) -> Option<String> {
        if self.shown == visible {
            return None;
        }
        self.shown = visible.to_vec();
        (!visible.is_empty()).then(|| render::suggestions(visible))
    }
}

pub async fn run(api: Arc<dyn PaymentsApi>, login: &LoginArgs, timings: Timings) -> Result<()> {
    let session = Session::new();
    let user = session.login(api.as_ref(), &login.credentials()).await?;
    println!("Signed in as {}. Type 'help' for commands.", user.name);

    let dashboard = Dashboard::new(api.clone(), timings);
    print!("{}", dashboard.start().await);

    // Suggestions arrive after the debounce, so print them as they come in
    let printer = TaskSlot::new();
    let mut search = dashboard.payment_form().autocomplete().subscribe();
    printer.schedule(async move {
        let mut echo = SuggestionEcho::default();
        while search.changed().await.is_ok() {
            let listing = echo.update(search.borrow_and_update().visible_suggestions());
            if let Some(listing) = listing {
                print!("{}", listing);
            }
        }
    });

    let result = read_commands(&dashboard).await;

    printer.cancel();
    session.logout(api.as_ref()).await;
    result
}

async fn read_commands(dashboard: &Dashboard) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<DashboardCommand>() {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };
        match dashboard.handle(command).await {
            Some(output) => print!("{}", output),
            None => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::models::Credentials;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "type Jane Do".parse::<DashboardCommand>(),
            Ok(DashboardCommand::Type("Jane Do".to_string()))
        );
        assert_eq!(
            "type".parse::<DashboardCommand>(),
            Ok(DashboardCommand::Type(String::new()))
        );
        assert_eq!("pick 2".parse::<DashboardCommand>(), Ok(DashboardCommand::Pick(1)));
        assert!("pick 0".parse::<DashboardCommand>().is_err());
        assert!("pick x".parse::<DashboardCommand>().is_err());
        assert_eq!("quit".parse::<DashboardCommand>(), Ok(DashboardCommand::Quit));
        assert!("launch".parse::<DashboardCommand>().is_err());
    }

    #[test]
    fn test_parse_filter_bounds() {
        assert_eq!(
            "filter".parse::<DashboardCommand>(),
            Ok(DashboardCommand::Filter(DateRange::all()))
        );
        assert_eq!(
            "filter 2024-02-01".parse::<DashboardCommand>(),
            Ok(DashboardCommand::Filter(DateRange::new(
                Some(date("2024-02-01")),
                None
            )))
        );
        assert_eq!(
            "filter - 2024-01-31".parse::<DashboardCommand>(),
            Ok(DashboardCommand::Filter(DateRange::new(
                None,
                Some(date("2024-01-31"))
            )))
        );
        assert!("filter 2024-13-01".parse::<DashboardCommand>().is_err());
        assert!("filter a b c".parse::<DashboardCommand>().is_err());
    }

    #[test]
    fn test_suggestions_echo_only_on_change() {
        let jane = Patient {
            id: 3,
            name: "Jane Doe".to_string(),
        };
        let mut echo = SuggestionEcho::default();

        assert_eq!(echo.update(&[]), None);
        assert_eq!(
            echo.update(std::slice::from_ref(&jane)).as_deref(),
            Some("  [1] Jane Doe\n")
        );
        // Unrelated state changes leave the visible list as it was
        assert_eq!(echo.update(std::slice::from_ref(&jane)), None);

        // Hidden on blur, shown again on focus
        assert_eq!(echo.update(&[]), None);
        assert!(echo.update(std::slice::from_ref(&jane)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_prints_nothing_itself() {
        let gateway = Arc::new(InMemoryGateway::new());
        let dashboard = Dashboard::new(gateway, Timings::default());
        assert_eq!(
            dashboard.handle(DashboardCommand::Focus).await.as_deref(),
            Some("")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dashboard_session() {
        let gateway = Arc::new(InMemoryGateway::new().with_admin("admin", "secret", "Admin"));
        gateway
            .login(&Credentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();
        let dashboard = Dashboard::new(gateway.clone(), Timings::default());

        assert!(dashboard.start().await.contains(render::NO_PAYMENTS));

        let added = dashboard
            .handle(DashboardCommand::Patient("Jane Doe".to_string()))
            .await
            .unwrap();
        assert_eq!(added, "Patient \"Jane Doe\" added successfully!\n");

        dashboard
            .handle(DashboardCommand::Type("jane".to_string()))
            .await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        let picked = dashboard.handle(DashboardCommand::Pick(0)).await.unwrap();
        assert_eq!(picked, "selected Jane Doe\n");

        dashboard
            .handle(DashboardCommand::Amount("0".to_string()))
            .await;
        let rejected = dashboard.handle(DashboardCommand::Pay).await.unwrap();
        assert_eq!(rejected, "error: Please enter a valid amount.\n");

        dashboard
            .handle(DashboardCommand::Amount("1250".to_string()))
            .await;
        dashboard
            .handle(DashboardCommand::Date("2024-02-10".to_string()))
            .await;
        let paid = dashboard.handle(DashboardCommand::Pay).await.unwrap();
        assert_eq!(paid, "Payment added successfully!\n");

        tokio::time::sleep(Duration::from_millis(10)).await;
        let shown = dashboard.handle(DashboardCommand::Show).await.unwrap();
        assert!(shown.contains("February 10, 2024"));
        assert!(shown.contains("$1,250.00"));

        assert_eq!(dashboard.handle(DashboardCommand::Quit).await, None);
    }
}

use std::{process::ExitCode, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use time::{Date, macros::format_description};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use banque_rs::{
    ActionOutcome, Compte, CompteClient, CompteId, ComptePayload, ComptesView, Format,
    RefreshOutcome, RequestConfig, TypeCompte,
};

/// List, update and delete the accounts of a banque server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The URL of the server, without the `banque/comptes` path.
    #[arg(long, default_value = "http://127.0.0.1:8080/")]
    base_url: String,

    /// The wire format for requests and responses.
    #[arg(short, long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,

    /// Give up on a request after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every account.
    List,
    /// Replace an account. Fields that are not given keep their current value.
    Update {
        /// The ID of the account to replace.
        id: CompteId,
        /// The new balance.
        #[arg(long, allow_negative_numbers = true)]
        solde: Option<f64>,
        /// The new creation date, as YYYY-MM-DD.
        #[arg(long, value_parser = parse_date)]
        date_creation: Option<Date>,
        /// The new account type.
        #[arg(long = "type")]
        type_compte: Option<TypeCompte>,
    },
    /// Delete an account.
    Delete {
        /// The ID of the account to delete.
        id: CompteId,
    },
    /// Open a new account.
    Create {
        /// The opening balance.
        #[arg(long, allow_negative_numbers = true)]
        solde: f64,
        /// The creation date, as YYYY-MM-DD.
        #[arg(long, value_parser = parse_date)]
        date_creation: Date,
        /// The account type.
        #[arg(long = "type")]
        type_compte: TypeCompte,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Json,
    Xml,
}

impl From<FormatArg> for Format {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => Format::Json,
            FormatArg::Xml => Format::Xml,
        }
    }
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let client = match CompteClient::new(&args.base_url) {
        Ok(client) => client,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = RequestConfig::new(args.format.into());
    if let Some(seconds) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(seconds));
    }

    let mut view = ComptesView::new(config);

    match args.command {
        Command::List => {
            if !refresh(&mut view, &client).await {
                return ExitCode::FAILURE;
            }
        }
        Command::Update {
            id,
            solde,
            date_creation,
            type_compte,
        } => {
            if !refresh(&mut view, &client).await {
                return ExitCode::FAILURE;
            }

            let Some(current) = view.row(id).cloned() else {
                eprintln!("There is no account {id}");
                return ExitCode::FAILURE;
            };

            let replacement = Compte {
                id,
                solde: solde.unwrap_or(current.solde),
                date_creation: date_creation.unwrap_or(current.date_creation),
                type_compte: type_compte.unwrap_or(current.type_compte),
            };

            let outcome = view.update(&client, id, &replacement).await;
            if !report(&view, outcome) {
                return ExitCode::FAILURE;
            }
        }
        Command::Delete { id } => {
            let outcome = view.delete(&client, id).await;
            if !report(&view, outcome) {
                return ExitCode::FAILURE;
            }
        }
        Command::Create {
            solde,
            date_creation,
            type_compte,
        } => {
            let payload = ComptePayload {
                id: None,
                solde,
                date_creation,
                type_compte,
            };

            match client.create(&view.request_config(), &payload).await {
                Ok(compte) => println!("Created account {}", compte.id),
                Err(error) => {
                    eprintln!("Could not create the account: {error}");
                    return ExitCode::FAILURE;
                }
            }

            if !refresh(&mut view, &client).await {
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

/// Refresh the view and print it, returning whether the refresh succeeded.
async fn refresh(view: &mut ComptesView, client: &CompteClient) -> bool {
    let outcome = view.refresh(client).await;
    print_refresh(view, &outcome)
}

/// Print the notification and the refreshed rows, returning whether the action succeeded.
fn report(view: &ComptesView, outcome: ActionOutcome) -> bool {
    if outcome.notification.is_error() {
        eprintln!("{}", outcome.notification);
        return false;
    }

    println!("{}", outcome.notification);

    match outcome.refresh {
        Some(refresh) => print_refresh(view, &refresh),
        None => true,
    }
}

fn print_refresh(view: &ComptesView, outcome: &RefreshOutcome) -> bool {
    match outcome {
        RefreshOutcome::Applied(_) | RefreshOutcome::Stale => {
            print_rows(view.rows());
            true
        }
        RefreshOutcome::Failed(error) => {
            eprintln!("Could not fetch the accounts: {error}");
            false
        }
    }
}

fn print_rows(comptes: &[Compte]) {
    if comptes.is_empty() {
        println!("No accounts.");
        return;
    }

    println!("{:>6}  {:>14}  {:<10}  TYPE", "ID", "SOLDE", "CREATION");
    for compte in comptes {
        println!(
            "{:>6}  {:>14.2}  {:<10}  {}",
            compte.id, compte.solde, compte.date_creation, compte.type_compte
        );
    }
}

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context};
use clap::{Arg, ArgMatches, Command};
use feeportal::{
    auth::dto::PublicUser,
    card::{format_card_number, format_expiry_date, PaymentForm},
    client::{
        ApiClient, AuthApi, FileTokenStore, SessionManager, SessionStatus, TokenStore,
        DEFAULT_BASE_URL,
    },
    logging,
};

fn command() -> Command {
    Command::new("feesctl")
        .about("Student fee portal client")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(
            Arg::new("url")
                .long("url")
                .help("API base URL")
                .env("FEEPORTAL_URL")
                .default_value(DEFAULT_BASE_URL)
                .global(true),
        )
        .arg(
            Arg::new("token-file")
                .long("token-file")
                .help("Where the session token is kept")
                .env("FEEPORTAL_TOKEN_FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(Command::new("health").about("Check that the server is up"))
        .subcommand(
            Command::new("register")
                .about("Create an account and sign in")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("email").long("email").required(true))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .env("FEEPORTAL_PASSWORD")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password")
                .arg(Arg::new("email").long("email").required(true))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .env("FEEPORTAL_PASSWORD")
                        .required(true),
                ),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .subcommand(Command::new("whoami").about("Show the signed-in student"))
        .subcommand(Command::new("students").about("List all students"))
        .subcommand(
            Command::new("profile")
                .about("Update name and email")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("email").long("email").required(true)),
        )
        .subcommand(
            Command::new("pay")
                .about("Pay fees with a card")
                .arg(
                    Arg::new("cardholder")
                        .long("cardholder")
                        .help("Name on the card")
                        .required(true),
                )
                .arg(Arg::new("card").long("card").required(true))
                .arg(
                    Arg::new("expiry")
                        .long("expiry")
                        .help("MM/YY")
                        .required(true),
                )
                .arg(Arg::new("cvv").long("cvv").required(true)),
        )
}

fn arg<'a>(m: &'a ArgMatches, id: &str) -> anyhow::Result<&'a str> {
    m.get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing --{id}"))
}

fn print_user(user: &PublicUser) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(user)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_cli("feesctl=warn,feeportal=warn");

    let matches = command().get_matches();
    let url = arg(&matches, "url")?;
    let token_path = match matches.get_one::<PathBuf>("token-file") {
        Some(p) => p.clone(),
        None => FileTokenStore::default_path()?,
    };
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(token_path));
    let session = SessionManager::new(ApiClient::new(url)?, tokens);

    match matches.subcommand() {
        Some(("health", _)) => {
            let health = session.api().health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Some(("register", m)) => {
            let user = session
                .register(arg(m, "name")?, arg(m, "email")?, arg(m, "password")?)
                .await?;
            print_user(&user)?;
        }
        Some(("login", m)) => {
            let user = session.login(arg(m, "email")?, arg(m, "password")?).await?;
            print_user(&user)?;
        }
        Some(("logout", _)) => {
            session.logout().await;
            println!("Logged out");
        }
        Some(("whoami", _)) => {
            let state = session.start().await;
            match (state.status, state.user) {
                (SessionStatus::Authenticated, Some(user)) => print_user(&user)?,
                (SessionStatus::ServerUnreachable, _) => {
                    bail!("cannot reach {url}; the stored session was kept")
                }
                _ => bail!("not logged in"),
            }
        }
        Some(("students", _)) => {
            let students = session.list_students().await?;
            println!("{}", serde_json::to_string_pretty(&students)?);
        }
        Some(("profile", m)) => {
            require_session(&session).await?;
            let user = session
                .update_profile(arg(m, "name")?, arg(m, "email")?)
                .await?;
            print_user(&user)?;
        }
        Some(("pay", m)) => {
            require_session(&session).await?;
            let form = PaymentForm {
                cardholder_name: arg(m, "cardholder")?.to_string(),
                card_number: format_card_number(arg(m, "card")?),
                expiry_date: format_expiry_date(arg(m, "expiry")?),
                cvv: arg(m, "cvv")?.to_string(),
            };
            let user = session.pay_fees(&form).await?;
            print_user(&user)?;
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}

async fn require_session<A: AuthApi>(session: &SessionManager<A>) -> anyhow::Result<()> {
    let state = session.start().await;
    match state.status {
        SessionStatus::Authenticated => Ok(()),
        SessionStatus::ServerUnreachable => bail!("server is not reachable"),
        _ => bail!("not logged in; run `feesctl login` first"),
    }
}

//!
//! timeclock command-line front-end
//! --------------------------------
//! Logs in, resolves the clock direction for the signed-in employee (or a kiosk
//! username), optionally performs the clock action, and logs out again.

pub mod outputformatter;

use anyhow::{anyhow, bail, Context, Result};

use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::clock::{ClockActionError, ClockOutcome, ClockResolver, ClockService, Kiosk};
use crate::config::ClientConfig;
use crate::geo::{FixedLocator, Geolocator, NoLocator};
use crate::models::GeoCoordinate;
use crate::session::SessionContext;

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\n  {program} [--api <url>] --user <u> --password <p> [--lat <f> --lon <f>] <command>\n\nCommands:\n  status                         show next clock action, jobs or open shift\n  clock-in [--job <id>]          clock in (job required when more than one is assigned)\n  clock-out                      clock out of the open shift\n  kiosk <username> [status|clock-in [--job <id>]|clock-out]\n                                 act on behalf of another employee on a shared device\n  whoami                         show the signed-in user\n\nFlags:\n  --api <url>        API base URL (default: $TIMECLOCK_API_URL or http://localhost:8080/api)\n  --user <u>         username (default: $TIMECLOCK_USER)\n  --password <p>     password (default: $TIMECLOCK_PASSWORD)\n  --lat/--lon <f>    device position; without them 0,0 is submitted\n  -h, --help         show this help"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Status,
    ClockIn { job: Option<i64> },
    ClockOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Clock(Action),
    Kiosk { username: String, action: Action },
    WhoAmI,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub api: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub position: Option<GeoCoordinate>,
    pub command: Command,
}

fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i).map(|s| s.as_str()).ok_or_else(|| anyhow!("{} requires a value", flag))
}

fn parse_action(words: &[&str], job: Option<i64>) -> Result<Action> {
    match words {
        [] | ["status"] => Ok(Action::Status),
        ["clock-in"] => Ok(Action::ClockIn { job }),
        ["clock-out"] => Ok(Action::ClockOut),
        other => bail!("unknown command: {}", other.join(" ")),
    }
}

/// Parse everything after the program name.
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut api = None;
    let mut user = None;
    let mut password = None;
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;
    let mut job: Option<i64> = None;
    let mut words: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                return Ok(CliArgs { api, user, password, position: None, command: Command::Help });
            }
            "--api" => api = Some(take_value(args, &mut i, "--api")?.to_string()),
            "--user" => user = Some(take_value(args, &mut i, "--user")?.to_string()),
            "--password" => password = Some(take_value(args, &mut i, "--password")?.to_string()),
            "--lat" => lat = Some(take_value(args, &mut i, "--lat")?.parse().context("--lat expects a number")?),
            "--lon" => lon = Some(take_value(args, &mut i, "--lon")?.parse().context("--lon expects a number")?),
            "--job" => job = Some(take_value(args, &mut i, "--job")?.parse().context("--job expects an id")?),
            flag if flag.starts_with("--") => bail!("unknown flag: {}", flag),
            word => words.push(word),
        }
        i += 1;
    }
    let position = match (lat, lon) {
        (Some(la), Some(lo)) => Some(GeoCoordinate::new(la, lo)),
        (None, None) => None,
        _ => bail!("--lat and --lon must be given together"),
    };
    let command = match words.as_slice() {
        [] => Command::Help,
        ["whoami"] => Command::WhoAmI,
        ["kiosk"] => bail!("kiosk requires a username"),
        ["kiosk", username, rest @ ..] => Command::Kiosk { username: username.to_string(), action: parse_action(rest, job)? },
        rest => Command::Clock(parse_action(rest, job)?),
    };
    Ok(CliArgs { api, user, password, position, command })
}

async fn run_action(resolver: &ClockResolver, action: Action, locator: &dyn Geolocator) -> Result<()> {
    resolver.refresh().await;
    let outcome: Option<std::result::Result<ClockOutcome, ClockActionError>> = match action {
        Action::Status => None,
        Action::ClockIn { job } => {
            if let Some(job_id) = job {
                resolver.select_job(job_id).map_err(|e| anyhow!(e.user_message()))?;
            }
            Some(resolver.clock_in(locator).await)
        }
        Action::ClockOut => Some(resolver.clock_out(locator).await),
    };
    match outcome {
        None => {}
        Some(Ok(done)) => {
            if done.fix.is_degraded() {
                println!("location unavailable; submitted 0,0");
            }
            println!("done.");
        }
        Some(Err(e)) => {
            println!("{}", outputformatter::render_view(&resolver.view()));
            bail!(e.user_message());
        }
    }
    println!("{}", outputformatter::render_view(&resolver.view()));
    Ok(())
}

pub async fn run(args: CliArgs) -> Result<()> {
    if args.command == Command::Help {
        println!("{}", usage("timeclock"));
        return Ok(());
    }
    let mut config = ClientConfig::from_env()?;
    if let Some(api) = &args.api {
        config = config.with_base_url(api)?;
    }
    let user = args.user.clone().or_else(|| std::env::var("TIMECLOCK_USER").ok()).ok_or_else(|| anyhow!("--user is required"))?;
    let password = args
        .password
        .clone()
        .or_else(|| std::env::var("TIMECLOCK_PASSWORD").ok())
        .ok_or_else(|| anyhow!("--password is required"))?;

    let session = SessionContext::new();
    let client = ApiClient::new(config, session)?;
    let auth = AuthService::new(client.clone());
    let me = auth.login(&user, &password).await.map_err(|e| anyhow!(e.user_message())).context("login failed")?;

    let locator: Box<dyn Geolocator> = match args.position {
        Some(p) => Box::new(FixedLocator(p)),
        None => Box::new(NoLocator),
    };
    let service = ClockService::new(client.clone());
    let result = match &args.command {
        Command::WhoAmI => {
            println!("{}", outputformatter::render_user(&me));
            Ok(())
        }
        Command::Clock(action) => {
            let resolver = ClockResolver::new(service, me.id);
            run_action(&resolver, *action, locator.as_ref()).await
        }
        Command::Kiosk { username, action } => {
            let kiosk = Kiosk::new(service);
            match kiosk.open(username).await {
                Ok((employee, resolver)) => {
                    println!("employee: {} {} ({})", employee.first_name, employee.last_name, employee.username);
                    run_action(&resolver, *action, locator.as_ref()).await
                }
                Err(e) => Err(anyhow!(e.user_message())),
            }
        }
        Command::Help => Ok(()),
    };
    auth.logout().await;
    result
}
